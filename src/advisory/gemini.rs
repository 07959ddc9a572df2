//! `generateContent` client for the Gemini API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::endpoint::{GenerateRequest, GenerateResponse, GenerativeEndpoint, Source};
use crate::config::AdvisoryConfig;
use crate::errors::AdvisoryError;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Deserialize)]
struct GoogleError {
    code: Option<u16>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

pub struct GeminiEndpoint {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiEndpoint {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self::with_client(client, api_key, model, base_url)
    }

    /// Creates an endpoint with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `None` when the configuration carries no usable key.
    pub fn from_config(config: &AdvisoryConfig) -> Option<Self> {
        let key = config.usable_api_key()?;
        Some(Self::new(
            key,
            config.model.clone(),
            config.base_url.clone(),
            config.request_timeout(),
        ))
    }

    fn build_request_body(&self, request: &GenerateRequest) -> Value {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }]
        });
        if let Some(schema) = &request.json_schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        if request.search_grounding {
            body["tools"] = json!([{ "googleSearch": {} }]);
        }
        body
    }
}

fn into_response(parsed: GenerateContentResponse) -> GenerateResponse {
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return GenerateResponse::default();
    };
    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    let sources = candidate
        .grounding_metadata
        .map(|meta| {
            meta.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri?;
                    Some(Source {
                        title: web.title.unwrap_or_else(|| uri.clone()),
                        uri,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    GenerateResponse { text, sources }
}

#[async_trait]
impl GenerativeEndpoint for GeminiEndpoint {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AdvisoryError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.build_request_body(&request);
        tracing::debug!(model = %self.model, json = request.json_schema.is_some(), "calling generateContent");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&text) {
                return Err(AdvisoryError::Api {
                    status: error_response.error.code.unwrap_or(status.as_u16()),
                    message: error_response.error.message,
                });
            }
            return Err(AdvisoryError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        Ok(into_response(parsed))
    }
}
