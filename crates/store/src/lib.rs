pub mod document;
pub mod error;
pub mod loader;
pub mod memory;
pub mod model;
pub mod neo4j_store;

pub use document::{GraphDocument, DocumentNode, DocumentRelationship, read_documents};
pub use error::StoreError;
pub use loader::{Neo4jLoader, LoadStats};
pub use memory::MemoryGraph;
pub use model::{Direction, GraphNode, Relationship, RelationshipKey, StoredEdge};
pub use neo4j_store::Neo4jStore;

use async_trait::async_trait;

/// Read-only access to a property graph.
///
/// Traversal itself lives with the caller: a store only resolves anchors
/// and expands one hop at a time.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// All nodes whose `id`, lowercased, equals `entity` lowercased.
    async fn find_nodes(&self, entity: &str) -> Result<Vec<GraphNode>, StoreError>;

    /// Every edge leaving (`Outbound`) or entering (`Inbound`) one of the
    /// frontier nodes, given by element id.
    async fn expand(
        &self,
        frontier: &[String],
        direction: Direction,
    ) -> Result<Vec<StoredEdge>, StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
