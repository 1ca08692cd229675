//! Per-run state: which nodes completed and what they produced.
//!
//! Owned by a single orchestration run and dropped with it.

use std::collections::{HashMap, HashSet};

use ragloom_types::workflow::NodeOutput;

/// A second output was recorded for a node that already has one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("output for node '{0}' was already recorded")]
pub struct DuplicateOutput(pub String);

/// Completed set plus write-once output table.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    completed: HashSet<String>,
    outputs: HashMap<String, NodeOutput>,
    order: Vec<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node's output and mark it completed.
    pub fn record(&mut self, node_id: &str, output: NodeOutput) -> Result<(), DuplicateOutput> {
        if self.completed.contains(node_id) {
            return Err(DuplicateOutput(node_id.to_string()));
        }
        self.completed.insert(node_id.to_string());
        self.outputs.insert(node_id.to_string(), output);
        self.order.push(node_id.to_string());
        Ok(())
    }

    pub fn completed(&self) -> &HashSet<String> {
        &self.completed
    }

    pub fn output(&self, node_id: &str) -> Option<&NodeOutput> {
        self.outputs.get(node_id)
    }

    /// Node ids in the order they were processed.
    pub fn processed(&self) -> &[String] {
        &self.order
    }

    pub fn into_parts(self) -> (HashMap<String, NodeOutput>, Vec<String>) {
        (self.outputs, self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_write_once() {
        let mut state = RunState::new();
        state
            .record("q1", NodeOutput::UserQuery { query: "a".into() })
            .unwrap();
        let err = state
            .record("q1", NodeOutput::UserQuery { query: "b".into() })
            .unwrap_err();
        assert_eq!(err, DuplicateOutput("q1".to_string()));
        assert_eq!(
            state.output("q1"),
            Some(&NodeOutput::UserQuery { query: "a".into() })
        );
        assert_eq!(state.processed(), &["q1".to_string()]);
    }

    #[test]
    fn test_processed_keeps_order() {
        let mut state = RunState::new();
        state.record("b", NodeOutput::error("x")).unwrap();
        state.record("a", NodeOutput::error("y")).unwrap();
        assert_eq!(state.processed(), &["b".to_string(), "a".to_string()]);
        assert!(state.completed().contains("a"));
    }
}
