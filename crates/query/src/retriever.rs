use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::result::{EntityFailure, RetrievalResult};
use crate::traversal::{find_grandparent, traverse};
use store::{Direction, GraphStore, Relationship, StoreError};

/// What the store said about one entity.
#[derive(Debug)]
pub enum EntityOutcome {
    Matched {
        anchors: usize,
        /// Deduplicated by relationship identity, in discovery order.
        relationships: Vec<Relationship>,
        grandparent: Option<String>,
    },
    NoMatch,
    Failed(StoreError),
}

#[derive(Debug)]
pub struct EntityRetrieval {
    pub entity: String,
    pub outcome: EntityOutcome,
}

impl EntityRetrieval {
    /// Text block for this entity, one `\n`-terminated line each.
    pub fn render(&self) -> String {
        let entity = &self.entity;
        let mut text = String::new();

        match &self.outcome {
            EntityOutcome::Matched { relationships, grandparent, .. } => {
                let lines = sorted_lines(relationships);
                if lines.is_empty() {
                    text.push_str(&format!("No relationships found for entity: {}\n", entity));
                } else {
                    for line in lines {
                        text.push_str(&line);
                        text.push('\n');
                    }
                }

                match grandparent {
                    Some(id) => text.push_str(&format!("Grandparent id of {}: {}\n", entity, id)),
                    None => text.push_str(&format!("No grandparent found for {}\n", entity)),
                }
            }
            EntityOutcome::NoMatch => {
                text.push_str(&format!("No relationships found for entity: {}\n", entity));
                text.push_str(&format!("No grandparent found for {}\n", entity));
            }
            EntityOutcome::Failed(e) => {
                text.push_str(&format!(
                    "Failed to retrieve relationships for entity: {} ({})\n",
                    entity, e
                ));
            }
        }

        text
    }
}

fn sorted_lines(relationships: &[Relationship]) -> Vec<String> {
    let mut lines: Vec<String> = relationships.iter().map(|r| r.to_string()).collect();
    lines.sort();
    lines.dedup();
    lines
}

fn dedup_relationships(relationships: Vec<Relationship>) -> Vec<Relationship> {
    let mut seen = HashSet::new();
    relationships
        .into_iter()
        .filter(|r| seen.insert(r.key()))
        .collect()
}

/// Concatenate per-entity text blocks in input order.
pub fn render_text(retrievals: &[EntityRetrieval]) -> String {
    retrievals.iter().map(EntityRetrieval::render).collect()
}

/// Merge per-entity results into one node/edge index, in input order.
pub fn build_result(retrievals: &[EntityRetrieval]) -> RetrievalResult {
    let mut result = RetrievalResult::new();

    for retrieval in retrievals {
        match &retrieval.outcome {
            EntityOutcome::Matched { relationships, .. } => {
                for relationship in relationships {
                    result.add_relationship(relationship);
                }
            }
            EntityOutcome::NoMatch => result.unmatched.push(retrieval.entity.clone()),
            EntityOutcome::Failed(e) => result.failed.push(EntityFailure {
                entity: retrieval.entity.clone(),
                error: e.to_string(),
            }),
        }
    }

    result
}

/// Resolves entity names to their surrounding subgraph.
#[derive(Clone)]
pub struct StructuredRetriever {
    store: Arc<dyn GraphStore>,
    query_timeout: Duration,
    max_concurrent: usize,
}

impl StructuredRetriever {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            query_timeout: Duration::from_secs(30),
            max_concurrent: 4,
        }
    }

    /// Limit for one entity's whole lookup, not for the whole question.
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    async fn lookup(&self, entity: &str) -> Result<EntityOutcome, StoreError> {
        let store = self.store.as_ref();

        let anchors = store.find_nodes(entity).await?;
        if anchors.is_empty() {
            return Ok(EntityOutcome::NoMatch);
        }

        let mut relationships = traverse(store, &anchors, Direction::Outbound).await?;
        relationships.extend(traverse(store, &anchors, Direction::Inbound).await?);
        let relationships = dedup_relationships(relationships);

        let grandparent = find_grandparent(store, &anchors).await?;

        Ok(EntityOutcome::Matched {
            anchors: anchors.len(),
            relationships,
            grandparent,
        })
    }

    pub async fn retrieve_entity(&self, entity: &str) -> EntityRetrieval {
        debug!(entity, "getting relationships for entity");

        let outcome = match tokio::time::timeout(self.query_timeout, self.lookup(entity)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(entity, error = %e, "graph query failed");
                EntityOutcome::Failed(e)
            }
            Err(_) => {
                warn!(entity, timeout_ms = self.query_timeout.as_millis() as u64, "graph query timed out");
                EntityOutcome::Failed(StoreError::Timeout(self.query_timeout))
            }
        };

        match &outcome {
            EntityOutcome::Matched { anchors, relationships, grandparent } => debug!(
                entity,
                anchors,
                relationships = relationships.len(),
                grandparent = grandparent.as_deref().unwrap_or("-"),
                "entity resolved"
            ),
            EntityOutcome::NoMatch => debug!(entity, "no node matches entity"),
            EntityOutcome::Failed(_) => {}
        }

        EntityRetrieval {
            entity: entity.to_string(),
            outcome,
        }
    }

    /// One retrieval per entity, run concurrently, returned in input order.
    pub async fn retrieve_all(&self, entities: &[String]) -> Vec<EntityRetrieval> {
        let lookups: Vec<_> = entities.iter().map(|entity| self.retrieve_entity(entity)).collect();
        stream::iter(lookups)
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// Node/edge index for visualization.
    pub async fn retrieve(&self, entities: &[String]) -> RetrievalResult {
        build_result(&self.retrieve_all(entities).await)
    }

    /// Context text for the answer model.
    pub async fn retrieve_text(&self, entities: &[String]) -> String {
        render_text(&self.retrieve_all(entities).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use store::{GraphNode, MemoryGraph, StoredEdge};

    fn retriever(graph: MemoryGraph) -> StructuredRetriever {
        StructuredRetriever::new(Arc::new(graph))
    }

    fn names(entities: &[&str]) -> Vec<String> {
        entities.iter().map(|e| e.to_string()).collect()
    }

    fn sample_graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.relate("A", "WORKS_FOR", "B");
        graph.relate("B", "LOCATED_IN", "C");
        graph
    }

    /// Fails every query for one entity name and delegates the rest.
    struct FlakyStore {
        inner: MemoryGraph,
        broken: String,
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn find_nodes(&self, entity: &str) -> Result<Vec<GraphNode>, StoreError> {
            if entity == self.broken {
                return Err(StoreError::Query("connection reset".to_string()));
            }
            self.inner.find_nodes(entity).await
        }

        async fn expand(
            &self,
            frontier: &[String],
            direction: Direction,
        ) -> Result<Vec<StoredEdge>, StoreError> {
            self.inner.expand(frontier, direction).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Never answers, to exercise the per-entity timeout.
    struct StalledStore;

    #[async_trait]
    impl GraphStore for StalledStore {
        async fn find_nodes(&self, _entity: &str) -> Result<Vec<GraphNode>, StoreError> {
            std::future::pending().await
        }

        async fn expand(
            &self,
            _frontier: &[String],
            _direction: Direction,
        ) -> Result<Vec<StoredEdge>, StoreError> {
            std::future::pending().await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_chain_scenario_text() {
        let text = retriever(sample_graph()).retrieve_text(&names(&["A"])).await;

        assert_eq!(
            text,
            "A -[WORKS_FOR]-> B\nB -[LOCATED_IN]-> C\nGrandparent id of A: C\n"
        );
    }

    #[tokio::test]
    async fn test_text_includes_inbound_and_is_sorted() {
        let mut graph = sample_graph();
        graph.relate("Z", "OWNS", "B");
        graph.relate("D", "FUNDS", "Z");

        let text = retriever(graph).retrieve_text(&names(&["b"])).await;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "A -[WORKS_FOR]-> B",
                "B -[LOCATED_IN]-> C",
                "D -[FUNDS]-> Z",
                "Z -[OWNS]-> B",
                "No grandparent found for b",
            ]
        );
    }

    #[tokio::test]
    async fn test_no_match_text() {
        let text = retriever(sample_graph()).retrieve_text(&names(&["Ghost"])).await;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "No relationships found for entity: Ghost");
        assert!(!text.contains("-["));
    }

    #[tokio::test]
    async fn test_isolated_node_has_no_relationships() {
        let mut graph = sample_graph();
        graph.merge_node("Loner");

        let retrieval = retriever(graph).retrieve_entity("loner").await;
        assert!(matches!(
            &retrieval.outcome,
            EntityOutcome::Matched { anchors: 1, relationships, .. } if relationships.is_empty()
        ));
        assert!(retrieval.render().starts_with("No relationships found for entity: loner\n"));
    }

    #[tokio::test]
    async fn test_case_insensitive_resolution() {
        let mut graph = MemoryGraph::new();
        graph.relate("Acme", "LOCATED_IN", "Paris");
        let retriever = retriever(graph);

        let expected = retriever.retrieve(&names(&["Acme"])).await.triples();
        for probe in ["ACME", "acme", "AcMe"] {
            assert_eq!(retriever.retrieve(&names(&[probe])).await.triples(), expected);
        }
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_all_anchors() {
        let mut graph = MemoryGraph::new();
        let first = graph.add_node_unmerged("Acme");
        let second = graph.add_node_unmerged("ACME");
        let paris = graph.merge_node("Paris");
        let bob = graph.merge_node("Bob");
        graph.add_edge(first, "LOCATED_IN", paris);
        graph.add_edge(bob, "WORKS_FOR", second);

        let retrieval = retriever(graph).retrieve_entity("acme").await;
        match retrieval.outcome {
            EntityOutcome::Matched { anchors, relationships, .. } => {
                assert_eq!(anchors, 2);
                assert_eq!(relationships.len(), 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_relationship_identity_dedup() {
        // A parallel edge with the same type collapses to one relationship.
        let mut graph = MemoryGraph::new();
        let a = graph.merge_node("A");
        let b = graph.merge_node("B");
        graph.add_edge(a, "KNOWS", b);
        graph.add_edge(a, "KNOWS", b);
        graph.add_edge(b, "KNOWS", a);

        let result = retriever(graph).retrieve(&names(&["A"])).await;
        assert_eq!(result.relationships.len(), 2);
        assert_eq!(result.nodes, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_cycle_edges_appear_once() {
        let mut graph = MemoryGraph::new();
        graph.relate("A", "NEXT", "B");
        graph.relate("B", "NEXT", "C");
        graph.relate("C", "NEXT", "A");

        let result = retriever(graph).retrieve(&names(&["A"])).await;

        let mut triples = result.triples();
        triples.sort();
        assert_eq!(
            triples,
            vec![
                ("A".to_string(), "NEXT".to_string(), "B".to_string()),
                ("B".to_string(), "NEXT".to_string(), "C".to_string()),
                ("C".to_string(), "NEXT".to_string(), "A".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_multi_entity_is_concatenation() {
        let mut graph = sample_graph();
        graph.relate("X", "KNOWS", "Y");
        let retriever = retriever(graph);

        let both = retriever.retrieve(&names(&["A", "X"])).await;
        let a = retriever.retrieve(&names(&["A"])).await;
        let x = retriever.retrieve(&names(&["X"])).await;

        let mut expected = a.triples();
        expected.extend(x.triples());
        assert_eq!(both.triples(), expected);

        let text = retriever.retrieve_text(&names(&["A", "X"])).await;
        let a_text = retriever.retrieve_text(&names(&["A"])).await;
        let x_text = retriever.retrieve_text(&names(&["X"])).await;
        assert_eq!(text, format!("{}{}", a_text, x_text));
    }

    #[tokio::test]
    async fn test_independent_anchors_get_disjoint_ranges() {
        let mut graph = sample_graph();
        graph.relate("X", "KNOWS", "Y");

        let result = retriever(graph).retrieve(&names(&["A", "X"])).await;

        assert_eq!(result.nodes, vec!["A", "B", "C", "X", "Y"]);
        assert_eq!(result.relationships.len(), 3);
        for rel in &result.relationships[..2] {
            assert!(rel.source < 3 && rel.target < 3);
        }
        let last = &result.relationships[2];
        assert_eq!((last.source, last.target), (3, 4));
    }

    #[tokio::test]
    async fn test_idempotent() {
        let retriever = retriever(sample_graph());

        let mut first = retriever.retrieve(&names(&["B"])).await.triples();
        let mut second = retriever.retrieve(&names(&["B"])).await.triples();
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_no_match() {
        let store = FlakyStore {
            inner: sample_graph(),
            broken: "B".to_string(),
        };
        let retriever = StructuredRetriever::new(Arc::new(store));

        let retrievals = retriever.retrieve_all(&names(&["A", "B", "Ghost"])).await;
        assert!(matches!(retrievals[0].outcome, EntityOutcome::Matched { .. }));
        assert!(matches!(retrievals[1].outcome, EntityOutcome::Failed(StoreError::Query(_))));
        assert!(matches!(retrievals[2].outcome, EntityOutcome::NoMatch));

        let result = build_result(&retrievals);
        assert_eq!(result.unmatched, vec!["Ghost".to_string()]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].entity, "B");

        let text = render_text(&retrievals);
        assert!(text.contains("Failed to retrieve relationships for entity: B (graph query failed: connection reset)\n"));
        assert!(text.contains("No relationships found for entity: Ghost\n"));
        assert!(!text.contains("No relationships found for entity: B"));
    }

    #[tokio::test]
    async fn test_timeout_is_per_entity() {
        let retriever = StructuredRetriever::new(Arc::new(StalledStore))
            .with_query_timeout(Duration::from_millis(20));

        let retrievals = retriever.retrieve_all(&names(&["A", "B"])).await;
        assert_eq!(retrievals.len(), 2);
        for retrieval in &retrievals {
            assert!(matches!(retrieval.outcome, EntityOutcome::Failed(StoreError::Timeout(_))));
        }
    }

    #[tokio::test]
    async fn test_output_order_follows_input_order() {
        let mut graph = MemoryGraph::new();
        for i in 0..10 {
            graph.relate(&format!("E{}", i), "LINKS", &format!("T{}", i));
        }
        let retriever = retriever(graph).with_max_concurrent(3);

        let entities: Vec<String> = (0..10).rev().map(|i| format!("E{}", i)).collect();
        let retrievals = retriever.retrieve_all(&entities).await;

        let order: Vec<&str> = retrievals.iter().map(|r| r.entity.as_str()).collect();
        let expected: Vec<&str> = entities.iter().map(String::as_str).collect();
        assert_eq!(order, expected);
    }
}
