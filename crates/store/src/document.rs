use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::StoreError;

/// Relationship type linking a source document to the nodes it mentions.
pub const MENTIONS: &str = "MENTIONS";

/// One unit of graph extraction output, as produced by the batch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<DocumentNode>,
    #[serde(default)]
    pub relationships: Vec<DocumentRelationship>,
    /// Source text the graph was extracted from, if it was kept.
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

fn default_node_type() -> String {
    "Entity".to_string()
}

impl GraphDocument {
    /// Stable id of the source document, derived from its text.
    pub fn document_id(&self) -> Option<String> {
        self.source.as_deref().map(document_id)
    }
}

/// Generate a stable document id from source text
pub fn document_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Relationship types cannot be query parameters, so they are restricted to
/// `[A-Z0-9_]` before being spliced into a statement.
pub fn sanitize_rel_type(rel_type: &str) -> String {
    let mut sanitized: String = rel_type
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        sanitized.push_str("RELATED_TO");
    } else if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Read a JSON array of graph documents.
pub async fn read_documents(path: &Path) -> Result<Vec<GraphDocument>, StoreError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Document(format!("failed to read {}: {}", path.display(), e)))?;

    parse_documents(&content)
}

pub fn parse_documents(content: &str) -> Result<Vec<GraphDocument>, StoreError> {
    serde_json::from_str(content)
        .map_err(|e| StoreError::Document(format!("invalid graph documents: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rel_type() {
        assert_eq!(sanitize_rel_type("WORKS_FOR"), "WORKS_FOR");
        assert_eq!(sanitize_rel_type("works for"), "WORKS_FOR");
        assert_eq!(sanitize_rel_type("is-part-of"), "IS_PART_OF");
        assert_eq!(sanitize_rel_type("  "), "RELATED_TO");
        assert_eq!(sanitize_rel_type("2nd_owner"), "_2ND_OWNER");
    }

    #[test]
    fn test_document_id_is_stable() {
        let a = document_id("Acme hired Bob.");
        let b = document_id("Acme hired Bob.");
        let c = document_id("Acme fired Bob.");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_parse_documents() {
        let json = r#"[
            {
                "nodes": [{"id": "Acme", "type": "Organization"}, {"id": "Bob"}],
                "relationships": [{"source": "Bob", "target": "Acme", "type": "WORKS_FOR"}],
                "source": "Bob works for Acme."
            },
            {"nodes": [{"id": "Paris", "type": "Location"}]}
        ]"#;

        let docs = parse_documents(json).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].nodes[1].node_type, "Entity");
        assert_eq!(docs[0].relationships[0].rel_type, "WORKS_FOR");
        assert!(docs[0].document_id().is_some());
        assert!(docs[1].relationships.is_empty());
        assert!(docs[1].document_id().is_none());
    }

    #[test]
    fn test_parse_documents_rejects_garbage() {
        let err = parse_documents("{not json").unwrap_err();
        assert!(matches!(err, StoreError::Document(_)));
    }
}
