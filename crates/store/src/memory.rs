use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::document::{sanitize_rel_type, GraphDocument, MENTIONS};
use crate::error::StoreError;
use crate::model::{Direction, GraphNode, Relationship, StoredEdge};
use crate::GraphStore;

#[derive(Debug, Clone)]
struct MemoryNode {
    id: Option<String>,
    node_type: String,
}

#[derive(Debug, Clone)]
struct MemoryEdge {
    source: usize,
    rel_type: String,
    target: usize,
}

/// In-process property graph.
///
/// Element ids are `n{index}` for nodes and `r{index}` for relationships;
/// edges are returned in insertion order, which keeps traversal output
/// reproducible.
#[derive(Debug, Default, Clone)]
pub struct MemoryGraph {
    nodes: Vec<MemoryNode>,
    edges: Vec<MemoryEdge>,
    id_to_idx: HashMap<String, usize>,
    outgoing: HashMap<usize, Vec<usize>>,
    incoming: HashMap<usize, Vec<usize>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph with the same MERGE semantics the Neo4j loader uses.
    pub fn from_documents(documents: &[GraphDocument]) -> Self {
        let mut graph = Self::new();
        let mut seen: HashSet<(usize, String, usize)> = HashSet::new();

        for document in documents {
            for node in &document.nodes {
                graph.merge_typed_node(&node.id, &node.node_type);
            }

            for relation in &document.relationships {
                let source = graph.merge_node(&relation.source);
                let target = graph.merge_node(&relation.target);
                let rel_type = sanitize_rel_type(&relation.rel_type);
                if seen.insert((source, rel_type.clone(), target)) {
                    graph.push_edge(source, rel_type, target);
                }
            }

            if let Some(doc_id) = document.document_id() {
                let doc = graph.merge_typed_node(&doc_id, "Document");
                for node in &document.nodes {
                    let target = graph.merge_node(&node.id);
                    if seen.insert((doc, MENTIONS.to_string(), target)) {
                        graph.push_edge(doc, MENTIONS.to_string(), target);
                    }
                }
            }
        }

        graph
    }

    /// Return the node with this `id`, creating it if needed.
    pub fn merge_node(&mut self, id: &str) -> usize {
        self.merge_typed_node(id, "Entity")
    }

    fn merge_typed_node(&mut self, id: &str, node_type: &str) -> usize {
        if let Some(&idx) = self.id_to_idx.get(id) {
            return idx;
        }

        let idx = self.nodes.len();
        self.nodes.push(MemoryNode {
            id: Some(id.to_string()),
            node_type: node_type.to_string(),
        });
        self.id_to_idx.insert(id.to_string(), idx);
        idx
    }

    /// Add a node with no `id` property.
    pub fn add_anonymous_node(&mut self) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(MemoryNode {
            id: None,
            node_type: "Entity".to_string(),
        });
        idx
    }

    /// Add a node whose `id` may collide with an existing one.
    pub fn add_node_unmerged(&mut self, id: &str) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(MemoryNode {
            id: Some(id.to_string()),
            node_type: "Entity".to_string(),
        });
        self.id_to_idx.entry(id.to_string()).or_insert(idx);
        idx
    }

    /// Add an edge between two existing node indices. Parallel edges are kept.
    pub fn add_edge(&mut self, source: usize, rel_type: &str, target: usize) -> usize {
        self.push_edge(source, rel_type.to_string(), target)
    }

    /// Convenience for tests and fixtures: merge both endpoints by id.
    pub fn relate(&mut self, source: &str, rel_type: &str, target: &str) -> usize {
        let s = self.merge_node(source);
        let t = self.merge_node(target);
        self.add_edge(s, rel_type, t)
    }

    fn push_edge(&mut self, source: usize, rel_type: String, target: usize) -> usize {
        let idx = self.edges.len();
        self.edges.push(MemoryEdge {
            source,
            rel_type,
            target,
        });
        self.outgoing.entry(source).or_default().push(idx);
        self.incoming.entry(target).or_default().push(idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn count_by_type(&self, node_type: &str) -> usize {
        self.nodes.iter().filter(|n| n.node_type == node_type).count()
    }

    fn graph_node(&self, idx: usize) -> GraphNode {
        GraphNode::new(self.nodes[idx].id.clone(), format!("n{}", idx))
    }

    fn stored_edge(&self, idx: usize) -> StoredEdge {
        let edge = &self.edges[idx];
        StoredEdge {
            rel_id: format!("r{}", idx),
            relationship: Relationship::new(
                self.graph_node(edge.source),
                edge.rel_type.clone(),
                self.graph_node(edge.target),
            ),
        }
    }

    fn parse_element_id(&self, element_id: &str) -> Option<usize> {
        element_id
            .strip_prefix('n')
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|&idx| idx < self.nodes.len())
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn find_nodes(&self, entity: &str) -> Result<Vec<GraphNode>, StoreError> {
        let wanted = entity.to_lowercase();

        Ok(self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.id
                    .as_deref()
                    .is_some_and(|id| id.to_lowercase() == wanted)
            })
            .map(|(idx, _)| self.graph_node(idx))
            .collect())
    }

    async fn expand(
        &self,
        frontier: &[String],
        direction: Direction,
    ) -> Result<Vec<StoredEdge>, StoreError> {
        let adjacency = match direction {
            Direction::Outbound => &self.outgoing,
            Direction::Inbound => &self.incoming,
        };

        let mut edges = Vec::new();
        for element_id in frontier {
            // Unknown ids match nothing, as they would in Cypher.
            let Some(idx) = self.parse_element_id(element_id) else {
                continue;
            };
            if let Some(edge_ids) = adjacency.get(&idx) {
                edges.extend(edge_ids.iter().map(|&e| self.stored_edge(e)));
            }
        }

        Ok(edges)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_documents;

    #[tokio::test]
    async fn test_find_nodes_is_case_insensitive() {
        let mut graph = MemoryGraph::new();
        graph.relate("Acme", "LOCATED_IN", "Paris");

        for probe in ["ACME", "acme", "AcMe", "Acme"] {
            let nodes = graph.find_nodes(probe).await.unwrap();
            assert_eq!(nodes.len(), 1, "probe {}", probe);
            assert_eq!(nodes[0].identity(), "Acme");
        }

        assert!(graph.find_nodes("Acm").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expand_directions() {
        let mut graph = MemoryGraph::new();
        graph.relate("A", "WORKS_FOR", "B");
        graph.relate("C", "KNOWS", "B");

        let b = graph.find_nodes("B").await.unwrap().remove(0);

        let out = graph
            .expand(&[b.element_id.clone()], Direction::Outbound)
            .await
            .unwrap();
        assert!(out.is_empty());

        let inbound = graph
            .expand(&[b.element_id.clone()], Direction::Inbound)
            .await
            .unwrap();
        let rendered: Vec<String> = inbound.iter().map(|e| e.relationship.to_string()).collect();
        assert_eq!(rendered, vec!["A -[WORKS_FOR]-> B", "C -[KNOWS]-> B"]);
    }

    #[tokio::test]
    async fn test_expand_ignores_unknown_element_ids() {
        let mut graph = MemoryGraph::new();
        graph.relate("A", "WORKS_FOR", "B");

        let edges = graph
            .expand(&["n99".to_string(), "bogus".to_string()], Direction::Outbound)
            .await
            .unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn test_from_documents_merges() {
        let json = r#"[
            {
                "nodes": [{"id": "Bob", "type": "Person"}, {"id": "Acme", "type": "Organization"}],
                "relationships": [{"source": "Bob", "target": "Acme", "type": "works for"}],
                "source": "Bob works for Acme."
            },
            {
                "nodes": [{"id": "Bob", "type": "Person"}, {"id": "Acme", "type": "Organization"}],
                "relationships": [{"source": "Bob", "target": "Acme", "type": "WORKS_FOR"}]
            }
        ]"#;
        let docs = parse_documents(json).unwrap();
        let graph = MemoryGraph::from_documents(&docs);

        // Bob, Acme and one Document node.
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.count_by_type("Document"), 1);
        // WORKS_FOR once plus two MENTIONS.
        assert_eq!(graph.edge_count(), 3);
    }
}
