use anyhow::{Context, Result};
use neo4rs::{Graph, Query};
use tracing::info;

use crate::document::{sanitize_rel_type, GraphDocument, MENTIONS};

/// Seeds Neo4j from graph documents.
///
/// Everything is MERGEd, so re-running a load over the same documents is a
/// no-op apart from refreshing `type` properties.
pub struct Neo4jLoader {
    graph: Graph,
}

impl Neo4jLoader {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Create the lookup index on Entity.id
    pub async fn init_schema(&self) -> Result<()> {
        let query = Query::new(
            "CREATE INDEX entity_id_index IF NOT EXISTS FOR (e:Entity) ON (e.id)".to_string()
        );
        self.graph.run(query).await
            .context("Failed to create index on Entity.id")?;

        Ok(())
    }

    /// Number of Document nodes already present
    pub async fn document_count(&self) -> Result<usize> {
        let query = Query::new("MATCH (d:Document) RETURN count(d) as count".to_string());
        let mut result = self.graph.execute(query).await
            .context("Failed to count Document nodes")?;

        let count = if let Some(row) = result.next().await? {
            row.get::<i64>("count").unwrap_or(0) as usize
        } else {
            0
        };

        Ok(count)
    }

    /// Load documents unless the store already holds a previous load.
    pub async fn load_if_empty(&self, documents: &[GraphDocument]) -> Result<LoadStats> {
        let existing = self.document_count().await?;
        if existing > 0 {
            info!(existing, "Document nodes already present, skipping graph load");
            return Ok(LoadStats {
                skipped: true,
                ..LoadStats::default()
            });
        }

        self.init_schema().await?;
        self.load(documents).await
    }

    pub async fn load(&self, documents: &[GraphDocument]) -> Result<LoadStats> {
        let mut stats = LoadStats::default();

        for document in documents {
            for node in &document.nodes {
                self.merge_node(&node.id, &node.node_type).await?;
                stats.nodes += 1;
            }

            for relation in &document.relationships {
                self.merge_relationship(&relation.source, &relation.rel_type, &relation.target)
                    .await?;
                stats.relationships += 1;
            }

            if let (Some(doc_id), Some(text)) = (document.document_id(), document.source.as_ref()) {
                self.merge_document(&doc_id, text).await?;
                for node in &document.nodes {
                    self.merge_mention(&doc_id, &node.id).await?;
                }
                stats.documents += 1;
            }
        }

        info!(
            nodes = stats.nodes,
            relationships = stats.relationships,
            documents = stats.documents,
            "Graph documents loaded"
        );
        Ok(stats)
    }

    async fn merge_node(&self, id: &str, node_type: &str) -> Result<()> {
        let query = Query::new(
            r#"
            MERGE (e:Entity {id: $id})
            SET e.type = $type
            "#.to_string()
        )
        .param("id", id.to_string())
        .param("type", node_type.to_string());

        self.graph.run(query).await
            .context("Failed to merge node")?;

        Ok(())
    }

    async fn merge_relationship(&self, source: &str, rel_type: &str, target: &str) -> Result<()> {
        // Relationship types cannot be parameters; sanitize_rel_type keeps
        // the spliced text to [A-Z0-9_].
        let statement = format!(
            r#"
            MERGE (source:Entity {{id: $source_id}})
            MERGE (target:Entity {{id: $target_id}})
            MERGE (source)-[:{}]->(target)
            "#,
            sanitize_rel_type(rel_type)
        );
        let query = Query::new(statement)
            .param("source_id", source.to_string())
            .param("target_id", target.to_string());

        self.graph.run(query).await
            .context("Failed to merge relationship")?;

        Ok(())
    }

    async fn merge_document(&self, doc_id: &str, text: &str) -> Result<()> {
        let query = Query::new(
            r#"
            MERGE (d:Document {id: $id})
            SET d.text = $text
            "#.to_string()
        )
        .param("id", doc_id.to_string())
        .param("text", text.to_string());

        self.graph.run(query).await
            .context("Failed to merge document")?;

        Ok(())
    }

    async fn merge_mention(&self, doc_id: &str, node_id: &str) -> Result<()> {
        let statement = format!(
            r#"
            MATCH (d:Document {{id: $doc_id}})
            MATCH (e:Entity {{id: $node_id}})
            MERGE (d)-[:{}]->(e)
            "#,
            MENTIONS
        );
        let query = Query::new(statement)
            .param("doc_id", doc_id.to_string())
            .param("node_id", node_id.to_string());

        self.graph.run(query).await
            .context("Failed to link document to node")?;

        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadStats {
    pub skipped: bool,
    pub nodes: usize,
    pub relationships: usize,
    pub documents: usize,
}
