use serde::{Deserialize, Serialize};
use std::fmt;

/// A node as seen by the retriever.
///
/// Identity is the `id` property when the node has one, otherwise the
/// element id the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: Option<String>,
    pub element_id: String,
}

impl GraphNode {
    pub fn new(id: Option<String>, element_id: impl Into<String>) -> Self {
        Self {
            id,
            element_id: element_id.into(),
        }
    }

    pub fn identity(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.element_id)
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: GraphNode,
    pub rel_type: String,
    pub target: GraphNode,
}

/// Deduplication key: (source identity, type, target identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipKey {
    pub source: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    pub fn new(source: GraphNode, rel_type: impl Into<String>, target: GraphNode) -> Self {
        Self {
            source,
            rel_type: rel_type.into(),
            target,
        }
    }

    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            source: self.source.identity().to_string(),
            rel_type: self.rel_type.clone(),
            target: self.target.identity().to_string(),
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.source.identity(),
            self.rel_type,
            self.target.identity()
        )
    }
}

/// Which way a hop follows an edge relative to the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frontier node is the edge's source.
    Outbound,
    /// Frontier node is the edge's target.
    Inbound,
}

/// One edge returned by a hop, tagged with the store's relationship id so
/// traversal can track which directed edges it has already crossed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEdge {
    pub rel_id: String,
    pub relationship: Relationship,
}
