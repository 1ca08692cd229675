//! Workflow engine: graph model, dependency resolution, node execution and
//! orchestration.

pub mod executor;
pub mod graph;
pub mod input;
pub mod orchestrator;
pub mod resolver;
pub mod state;
