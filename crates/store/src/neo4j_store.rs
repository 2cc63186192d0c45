use async_trait::async_trait;
use neo4rs::{Graph, Query, Row};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{Direction, GraphNode, Relationship, StoredEdge};
use crate::GraphStore;

const FIND_NODES: &str = r#"
    MATCH (n)
    WHERE toLower(toString(n.id)) = toLower($entity)
    RETURN toString(n.id) AS id, elementId(n) AS element_id
"#;

const EXPAND_OUTBOUND: &str = r#"
    MATCH (s)-[r]->(t)
    WHERE elementId(s) IN $frontier
    RETURN elementId(r) AS rel_id, type(r) AS rel_type,
           toString(s.id) AS source_id, elementId(s) AS source_element,
           toString(t.id) AS target_id, elementId(t) AS target_element
"#;

const EXPAND_INBOUND: &str = r#"
    MATCH (s)-[r]->(t)
    WHERE elementId(t) IN $frontier
    RETURN elementId(r) AS rel_id, type(r) AS rel_type,
           toString(s.id) AS source_id, elementId(s) AS source_element,
           toString(t.id) AS target_id, elementId(t) AS target_element
"#;

/// Neo4j binding for read-side graph queries.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, StoreError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(graph))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn edge_from_row(row: &Row) -> Result<StoredEdge, StoreError> {
        let rel_id: String = row
            .get("rel_id")
            .map_err(|_| StoreError::Decode("missing rel_id".to_string()))?;
        let rel_type: String = row
            .get("rel_type")
            .map_err(|_| StoreError::Decode("missing rel_type".to_string()))?;
        let source_element: String = row
            .get("source_element")
            .map_err(|_| StoreError::Decode("missing source_element".to_string()))?;
        let target_element: String = row
            .get("target_element")
            .map_err(|_| StoreError::Decode("missing target_element".to_string()))?;

        // A null `id` property comes back as a decode error; treat it as absent.
        let source = GraphNode::new(row.get::<String>("source_id").ok(), source_element);
        let target = GraphNode::new(row.get::<String>("target_id").ok(), target_element);

        Ok(StoredEdge {
            rel_id,
            relationship: Relationship::new(source, rel_type, target),
        })
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn find_nodes(&self, entity: &str) -> Result<Vec<GraphNode>, StoreError> {
        let query = Query::new(FIND_NODES.to_string()).param("entity", entity.to_string());

        let mut result = self.graph.execute(query).await?;
        let mut nodes = Vec::new();

        while let Some(row) = result.next().await? {
            let element_id: String = row
                .get("element_id")
                .map_err(|_| StoreError::Decode("missing element_id".to_string()))?;
            nodes.push(GraphNode::new(row.get::<String>("id").ok(), element_id));
        }

        debug!(entity, anchors = nodes.len(), "resolved entity");
        Ok(nodes)
    }

    async fn expand(
        &self,
        frontier: &[String],
        direction: Direction,
    ) -> Result<Vec<StoredEdge>, StoreError> {
        if frontier.is_empty() {
            return Ok(Vec::new());
        }

        let statement = match direction {
            Direction::Outbound => EXPAND_OUTBOUND,
            Direction::Inbound => EXPAND_INBOUND,
        };
        let query = Query::new(statement.to_string()).param("frontier", frontier.to_vec());

        let mut result = self.graph.execute(query).await?;
        let mut edges = Vec::new();

        while let Some(row) = result.next().await? {
            edges.push(Self::edge_from_row(&row)?);
        }

        Ok(edges)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.graph.run(neo4rs::query("RETURN 1")).await?;
        Ok(())
    }
}
