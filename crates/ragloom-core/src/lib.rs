//! Workflow engine and repository trait definitions for Ragloom.
//!
//! This crate defines the "ports" (repository and collaborator traits) that
//! the infrastructure layer implements, plus the engine that runs a workflow
//! graph against them. It depends only on `ragloom-types` -- never on
//! `ragloom-infra` or any database/IO crate.

pub mod llm;
pub mod repository;
pub mod retrieval;
pub mod service;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
