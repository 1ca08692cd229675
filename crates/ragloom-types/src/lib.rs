//! Shared domain types for Ragloom.
//!
//! This crate contains the domain types used across the Ragloom workspace:
//! workflow graphs as drawn on the canvas, node outputs, execution records,
//! chat history, documents, collaborator requests and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, secrecy.

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod execution;
pub mod llm;
pub mod workflow;
