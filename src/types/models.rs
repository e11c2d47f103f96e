//! Model listing types

use serde::{Deserialize, Serialize};

/// A model served by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelCard {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
    /// Context length, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_model_len: Option<u64>,
}

/// Response of `GET /v1/models`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelList {
    #[serde(default)]
    pub object: String,
    pub data: Vec<ModelCard>,
}

impl ModelList {
    /// Identifiers of all served models
    pub fn ids(&self) -> Vec<&str> {
        self.data.iter().map(|model| model.id.as_str()).collect()
    }
}
