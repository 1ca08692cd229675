//! HTTP request handlers for the REST API.

pub mod chat;
pub mod document;
pub mod execution;
pub mod workflow;
