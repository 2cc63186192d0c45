use serde::{Deserialize, Serialize};

/// Entity information extracted from a question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    /// Person, organization, or business entities appearing in the text
    #[serde(default)]
    pub names: Vec<String>,
}
