use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::endpoint::Source;
use crate::errors::AdvisoryError;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```\s*$").expect("fence pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTraded {
    pub name: String,
    pub volume: String,
    pub change: String,
}

/// Structured market overview. `sources` come from the endpoint's grounding
/// metadata, never from the model's JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub top_traded: Vec<TopTraded>,
    pub hot_sectors: Vec<String>,
    pub summary: String,
    #[serde(default, skip_deserializing)]
    pub sources: Vec<Source>,
}

/// JSON schema sent with the market request.
pub fn market_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "topTraded": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "volume": { "type": "STRING" },
                        "change": { "type": "STRING" }
                    },
                    "required": ["name", "volume", "change"]
                }
            },
            "hotSectors": { "type": "ARRAY", "items": { "type": "STRING" } },
            "summary": { "type": "STRING" }
        },
        "required": ["topTraded", "hotSectors", "summary"]
    })
}

/// Removes a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Parses the model's answer. Every schema field is required.
pub fn parse_market_snapshot(
    text: &str,
    sources: Vec<Source>,
) -> Result<MarketSnapshot, AdvisoryError> {
    let mut snapshot: MarketSnapshot = serde_json::from_str(strip_code_fence(text))?;
    snapshot.sources = sources;
    Ok(snapshot)
}
