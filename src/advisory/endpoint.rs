use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AdvisoryError;

/// One generation request. `json_schema` asks for a JSON answer shaped by
/// the schema; `search_grounding` lets the model cite web sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub json_schema: Option<Value>,
    pub search_grounding: bool,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn json(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            json_schema: Some(schema),
            search_grounding: false,
        }
    }

    pub fn with_search_grounding(mut self) -> Self {
        self.search_grounding = true;
        self
    }
}

/// A citation reported by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub text: String,
    pub sources: Vec<Source>,
}

/// External generative text/JSON service. One attempt per call.
#[async_trait]
pub trait GenerativeEndpoint: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AdvisoryError>;
}
