//! Workflow graph model.
//!
//! Turns the canvas node and edge lists into an addressable graph with
//! validated identities. Cycles and self-edges are legal at load time: the
//! resolver simply never reaches the nodes on them. `petgraph` is used only
//! for the cycle diagnostic.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use ragloom_types::workflow::{EdgeSpec, NodeKind, NodeSpec};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a node/edge list cannot be loaded as a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node at position {index} has an empty id")]
    EmptyNodeId { index: usize },

    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(String),

    #[error("edge {from} -> {to} references unknown node '{missing}'")]
    UnknownEdgeEndpoint {
        from: String,
        to: String,
        missing: String,
    },

    #[error("node '{node_id}' has unsupported kind '{kind}'")]
    UnsupportedNodeKind { node_id: String, kind: String },
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A validated node: its kind is one the engine can run.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub config: Map<String, Value>,
}

impl Node {
    /// A string config value; `None` when absent, not a string, or blank.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// A boolean config flag; absent or non-boolean reads as `false`.
    pub fn config_flag(&self, key: &str) -> bool {
        self.config.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// `documentIds` as integers. Accepts numbers and numeric strings;
    /// anything else is skipped.
    pub fn document_ids(&self) -> Vec<i64> {
        let Some(Value::Array(items)) = self.config.get("documentIds") else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// An immutable workflow graph captured at execution start.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// Deduplicated edges in first-insertion order.
    edges: Vec<(usize, usize)>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl Graph {
    /// Validate and index a node/edge list.
    ///
    /// Fails on an empty or duplicated node id, an edge endpoint that names
    /// no node, or a node kind outside the four the engine runs.
    pub fn load(nodes: &[NodeSpec], edges: &[EdgeSpec]) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(nodes.len());
        let mut parsed = Vec::with_capacity(nodes.len());

        for (i, spec) in nodes.iter().enumerate() {
            if spec.id.trim().is_empty() {
                return Err(GraphError::EmptyNodeId { index: i });
            }
            if index.insert(spec.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateNodeId(spec.id.clone()));
            }
            let kind = spec
                .kind
                .parse::<NodeKind>()
                .map_err(|_| GraphError::UnsupportedNodeKind {
                    node_id: spec.id.clone(),
                    kind: spec.kind.clone(),
                })?;
            parsed.push(Node {
                id: spec.id.clone(),
                kind,
                config: spec.data.clone(),
            });
        }

        let mut deduped: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
        let mut successors = vec![Vec::new(); parsed.len()];
        let mut predecessors = vec![Vec::new(); parsed.len()];

        for edge in edges {
            let lookup = |id: &str| {
                index
                    .get(id)
                    .copied()
                    .ok_or_else(|| GraphError::UnknownEdgeEndpoint {
                        from: edge.source.clone(),
                        to: edge.target.clone(),
                        missing: id.to_string(),
                    })
            };
            let from = lookup(&edge.source)?;
            let to = lookup(&edge.target)?;

            if deduped.contains(&(from, to)) {
                continue;
            }
            deduped.push((from, to));
            successors[from].push(to);
            predecessors[to].push(from);
        }

        Ok(Self {
            nodes: parsed,
            index,
            edges: deduped,
            successors,
            predecessors,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Nodes in node-list order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node ids in node-list order.
    pub fn all_node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Targets of edges leaving `id`, in edge insertion order.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, &self.successors)
    }

    /// Sources of edges entering `id`, in edge insertion order.
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, &self.predecessors)
    }

    /// Nodes that never appear as an edge target, in node-list order.
    pub fn start_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.predecessors[*i].is_empty())
            .map(|(_, n)| n.id.as_str())
            .collect()
    }

    /// Nodes that sit on a cycle (including self-edges), in node-list order.
    pub fn cyclic_nodes(&self) -> Vec<&str> {
        let mut graph = DiGraph::<usize, ()>::with_capacity(self.nodes.len(), self.edges.len());
        let handles: Vec<_> = (0..self.nodes.len()).map(|i| graph.add_node(i)).collect();
        for &(from, to) in &self.edges {
            graph.add_edge(handles[from], handles[to], ());
        }

        let mut on_cycle = vec![false; self.nodes.len()];
        for component in tarjan_scc(&graph) {
            if component.len() > 1 {
                for handle in component {
                    on_cycle[graph[handle]] = true;
                }
            }
        }
        for &(from, to) in &self.edges {
            if from == to {
                on_cycle[from] = true;
            }
        }

        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| on_cycle[*i])
            .map(|(_, n)| n.id.as_str())
            .collect()
    }

    fn neighbours<'a>(&'a self, id: &str, table: &[Vec<usize>]) -> Vec<&'a str> {
        match self.index.get(id) {
            Some(&i) => table[i]
                .iter()
                .map(|&j| self.nodes[j].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: &str) -> NodeSpec {
        NodeSpec {
            id: id.to_string(),
            kind: kind.to_string(),
            data: Map::new(),
        }
    }

    fn edge(source: &str, target: &str) -> EdgeSpec {
        EdgeSpec::new(source, target)
    }

    #[test]
    fn test_load_chain() {
        let graph = Graph::load(
            &[node("q1", "userQuery"), node("l1", "llmEngine"), node("o1", "output")],
            &[edge("q1", "l1"), edge("l1", "o1")],
        )
        .unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.all_node_ids(), vec!["q1", "l1", "o1"]);
        assert_eq!(graph.successors("q1"), vec!["l1"]);
        assert_eq!(graph.predecessors("o1"), vec!["l1"]);
        assert_eq!(graph.start_nodes(), vec!["q1"]);
        assert_eq!(graph.node("l1").unwrap().kind, NodeKind::LlmEngine);
    }

    #[test]
    fn test_predecessors_follow_edge_order_not_sorted() {
        let graph = Graph::load(
            &[node("a", "userQuery"), node("b", "knowledgeBase"), node("z", "llmEngine")],
            &[edge("b", "z"), edge("a", "z")],
        )
        .unwrap();
        assert_eq!(graph.predecessors("z"), vec!["b", "a"]);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let graph = Graph::load(
            &[node("a", "userQuery"), node("b", "output")],
            &[edge("a", "b"), edge("a", "b")],
        )
        .unwrap();
        assert_eq!(graph.predecessors("b"), vec!["a"]);
        assert_eq!(graph.successors("a"), vec!["b"]);
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = Graph::load(&[node("a", "output"), node(" ", "output")], &[]).unwrap_err();
        assert_eq!(err, GraphError::EmptyNodeId { index: 1 });
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = Graph::load(&[node("a", "output"), node("a", "userQuery")], &[]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateNodeId("a".to_string()));
    }

    #[test]
    fn test_unknown_edge_endpoint_rejected() {
        let err = Graph::load(&[node("a", "userQuery")], &[edge("a", "ghost")]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownEdgeEndpoint { ref missing, .. } if missing == "ghost"
        ));
    }

    #[test]
    fn test_unsupported_kind_rejected() {
        let err = Graph::load(&[node("w", "webSearch")], &[]).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnsupportedNodeKind {
                node_id: "w".to_string(),
                kind: "webSearch".to_string(),
            }
        );
        assert!(err.to_string().contains("webSearch"));
    }

    #[test]
    fn test_no_edges_all_start_nodes() {
        let graph = Graph::load(&[node("x", "output"), node("y", "userQuery")], &[]).unwrap();
        assert_eq!(graph.start_nodes(), vec!["x", "y"]);
        assert!(graph.cyclic_nodes().is_empty());
    }

    #[test]
    fn test_cyclic_nodes_subset() {
        // q -> a -> b -> a, b -> o
        let graph = Graph::load(
            &[
                node("q", "userQuery"),
                node("a", "llmEngine"),
                node("b", "llmEngine"),
                node("o", "output"),
            ],
            &[edge("q", "a"), edge("a", "b"), edge("b", "a"), edge("b", "o")],
        )
        .unwrap();
        assert_eq!(graph.cyclic_nodes(), vec!["a", "b"]);
    }

    #[test]
    fn test_self_edge_is_cyclic() {
        let graph = Graph::load(&[node("s", "output")], &[edge("s", "s")]).unwrap();
        assert_eq!(graph.cyclic_nodes(), vec!["s"]);
        assert!(graph.start_nodes().is_empty());
    }

    #[test]
    fn test_unknown_id_has_no_neighbours() {
        let graph = Graph::load(&[node("a", "output")], &[]).unwrap();
        assert!(graph.successors("nope").is_empty());
        assert!(graph.node("nope").is_none());
    }

    #[test]
    fn test_document_ids_accept_numbers_and_strings() {
        let mut spec = node("kb", "knowledgeBase");
        spec.data.insert(
            "documentIds".to_string(),
            serde_json::json!([1, "2", " 3 ", "x", null, 4.5]),
        );
        let graph = Graph::load(&[spec], &[]).unwrap();
        assert_eq!(graph.node("kb").unwrap().document_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_config_accessors() {
        let mut spec = node("l", "llmEngine");
        spec.data.insert("model".into(), serde_json::json!("gpt-4o"));
        spec.data.insert("customPrompt".into(), serde_json::json!("  "));
        spec.data.insert("useWebSearch".into(), serde_json::json!(true));
        let graph = Graph::load(&[spec], &[]).unwrap();
        let node = graph.node("l").unwrap();
        assert_eq!(node.config_str("model"), Some("gpt-4o"));
        assert_eq!(node.config_str("customPrompt"), None);
        assert!(node.config_flag("useWebSearch"));
        assert!(!node.config_flag("missing"));
    }
}
