use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use store::Relationship;

/// One edge of the visualization graph, by local node index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedRelationship {
    pub source: usize,
    pub target: usize,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFailure {
    pub entity: String,
    pub error: String,
}

/// Node/edge index for one request.
///
/// `nodes[i]` is the identity of local node `i`. Nodes are only added when a
/// relationship first references them, so every index in `relationships` is
/// valid and no node is unreferenced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub nodes: Vec<String>,
    pub relationships: Vec<IndexedRelationship>,
    /// Entities with no anchor node.
    pub unmatched: Vec<String>,
    /// Entities whose store query failed or timed out.
    pub failed: Vec<EntityFailure>,
    #[serde(skip)]
    node_index: HashMap<String, usize>,
}

impl RetrievalResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_node(&mut self, identity: &str) -> usize {
        if let Some(&idx) = self.node_index.get(identity) {
            return idx;
        }

        let idx = self.nodes.len();
        self.nodes.push(identity.to_string());
        self.node_index.insert(identity.to_string(), idx);
        idx
    }

    pub fn add_relationship(&mut self, relationship: &Relationship) {
        let source = self.add_node(relationship.source.identity());
        let target = self.add_node(relationship.target.identity());
        self.relationships.push(IndexedRelationship {
            source,
            target,
            caption: relationship.rel_type.clone(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Relationships as `(source identity, type, target identity)` triples.
    pub fn triples(&self) -> Vec<(String, String, String)> {
        self.relationships
            .iter()
            .map(|r| {
                (
                    self.nodes[r.source].clone(),
                    r.caption.clone(),
                    self.nodes[r.target].clone(),
                )
            })
            .collect()
    }
}
