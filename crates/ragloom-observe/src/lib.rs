//! Observability for Ragloom: tracing subscriber setup.

pub mod tracing_setup;
