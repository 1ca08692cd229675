//! Merged node input.
//!
//! A node sees the outputs of its predecessors keyed by predecessor id, in
//! edge insertion order, plus the execution's top-level input under the
//! reserved `initial_input` key. Handlers read it through typed lookups that
//! scan entries in that order and take the first match.

use ragloom_types::workflow::NodeOutput;
use serde_json::{Map, Value};

use super::graph::Graph;
use super::state::RunState;

/// Reserved key holding the execution's top-level input.
pub const INITIAL_INPUT_KEY: &str = "initial_input";

/// Inputs available to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedInput {
    initial: Value,
    entries: Vec<(String, NodeOutput)>,
}

impl MergedInput {
    pub fn new(initial: Value) -> Self {
        Self {
            initial,
            entries: Vec::new(),
        }
    }

    /// Build the input for `node_id` from the outputs recorded so far.
    pub fn assemble(graph: &Graph, node_id: &str, state: &RunState, initial: &Value) -> Self {
        let mut input = Self::new(initial.clone());
        for pred in graph.predecessors(node_id) {
            if let Some(output) = state.output(pred) {
                input.insert(pred, output.clone());
            }
        }
        input
    }

    /// Add a predecessor output. A second entry for the same id is ignored.
    pub fn insert(&mut self, source: impl Into<String>, output: NodeOutput) {
        let source = source.into();
        if self.entries.iter().any(|(id, _)| *id == source) {
            return;
        }
        self.entries.push((source, output));
    }

    pub fn get(&self, source: &str) -> Option<&NodeOutput> {
        self.entries
            .iter()
            .find(|(id, _)| id == source)
            .map(|(_, out)| out)
    }

    pub fn initial(&self) -> &Value {
        &self.initial
    }

    /// Predecessor entries in merge order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &NodeOutput)> {
        self.entries.iter().map(|(id, out)| (id.as_str(), out))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `initial_input.query` when it is a string.
    pub fn initial_query(&self) -> Option<&str> {
        self.initial.get("query").and_then(Value::as_str)
    }

    pub fn first_user_query(&self) -> Option<&str> {
        self.entries.iter().find_map(|(_, out)| match out {
            NodeOutput::UserQuery { query } => Some(query.as_str()),
            _ => None,
        })
    }

    pub fn first_knowledge_base(&self) -> Option<&str> {
        self.entries.iter().find_map(|(_, out)| match out {
            NodeOutput::KnowledgeBase { context } => Some(context.as_str()),
            _ => None,
        })
    }

    /// First LLM response with its sources.
    pub fn first_llm_response(&self) -> Option<(&str, &[String])> {
        self.entries.iter().find_map(|(_, out)| match out {
            NodeOutput::LlmResponse { response, sources } => {
                Some((response.as_str(), sources.as_slice()))
            }
            _ => None,
        })
    }

    /// JSON view: `{"initial_input": ..., "<pred id>": <output>, ...}`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(INITIAL_INPUT_KEY.to_string(), self.initial.clone());
        for (id, out) in &self.entries {
            let value = serde_json::to_value(out).unwrap_or(Value::Null);
            map.insert(id.clone(), value);
        }
        Value::Object(map)
    }
}
