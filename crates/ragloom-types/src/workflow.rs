//! Workflow domain types for Ragloom.
//!
//! A workflow is stored exactly as the visual canvas (React Flow) emits it: a
//! list of nodes `{id, type, data}` and a list of edges `{source, target}`.
//! Any extra canvas fields (positions, handles, styling) are ignored on load.
//! This module also defines `NodeOutput`, the tagged value each node produces
//! during an execution.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A saved workflow: name plus the canvas node and edge lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// UUIDv7 assigned on first save.
    pub id: Uuid,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Canvas nodes, in the order the canvas listed them.
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    /// Canvas edges, in insertion order.
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The importable part of a workflow: what a canvas export or a REST create
/// request carries before an id and timestamps are assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

// ---------------------------------------------------------------------------
// Nodes and edges (wire format)
// ---------------------------------------------------------------------------

/// A node as it appears on the wire.
///
/// The `type` tag is kept as a raw string so that an unknown kind can be
/// reported by the graph loader instead of failing deserialization of the
/// whole workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Node configuration (`query`, `documentIds`, `model`, ...).
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// A directed data dependency between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
        }
    }
}

/// The four node kinds the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    UserQuery,
    KnowledgeBase,
    LlmEngine,
    Output,
}

impl NodeKind {
    /// The canvas tag for this kind.
    pub fn as_tag(&self) -> &'static str {
        match self {
            NodeKind::UserQuery => "userQuery",
            NodeKind::KnowledgeBase => "knowledgeBase",
            NodeKind::LlmEngine => "llmEngine",
            NodeKind::Output => "output",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "userQuery" => Ok(NodeKind::UserQuery),
            "knowledgeBase" => Ok(NodeKind::KnowledgeBase),
            "llmEngine" => Ok(NodeKind::LlmEngine),
            "output" => Ok(NodeKind::Output),
            other => Err(format!("unsupported node kind: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Node output
// ---------------------------------------------------------------------------

/// The value one node produced during an execution.
///
/// Written once per node per execution and read by every successor. A failed
/// node still produces a value: the `Error` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeOutput {
    UserQuery {
        query: String,
    },
    KnowledgeBase {
        context: String,
    },
    LlmResponse {
        response: String,
        #[serde(default)]
        sources: Vec<String>,
    },
    Output {
        response: String,
        #[serde(default)]
        sources: Vec<String>,
    },
    Error {
        error: String,
    },
}

impl NodeOutput {
    pub fn error(message: impl Into<String>) -> Self {
        NodeOutput::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, NodeOutput::Error { .. })
    }

    /// The serialized `type` tag of this output.
    pub fn type_tag(&self) -> &'static str {
        match self {
            NodeOutput::UserQuery { .. } => "user_query",
            NodeOutput::KnowledgeBase { .. } => "knowledge_base",
            NodeOutput::LlmResponse { .. } => "llm_response",
            NodeOutput::Output { .. } => "output",
            NodeOutput::Error { .. } => "error",
        }
    }
}
