//! Application services built on the repository ports and the engine.

pub mod execution;
pub mod workflow;
