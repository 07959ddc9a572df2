//! Advisory Client: advice, inspiration and market commentary from a
//! generative endpoint, with fixed fallback content.
//!
//! None of the public calls fail. Every endpoint error, timeout or malformed
//! answer is logged and replaced by the matching fallback.

pub mod endpoint;
pub mod fallback;
pub mod gemini;
pub mod market;
pub mod prompt;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::AdvisoryConfig;
use crate::domain::{Account, Transaction};
use crate::errors::AdvisoryError;

pub use endpoint::{GenerateRequest, GenerateResponse, GenerativeEndpoint, Source};
pub use fallback::{
    fallback_market_snapshot, ADVICE_EMPTY, ADVICE_NOT_CONFIGURED, ADVICE_UNAVAILABLE,
    INSPIRATION_FALLBACKS,
};
pub use gemini::GeminiEndpoint;
pub use market::{MarketSnapshot, TopTraded};
pub use prompt::FinancialSummary;

pub struct AdvisoryClient {
    endpoint: Option<Arc<dyn GenerativeEndpoint>>,
    timeout: Duration,
}

impl AdvisoryClient {
    /// `endpoint` is `None` when no usable API key was configured.
    pub fn new(endpoint: Option<Arc<dyn GenerativeEndpoint>>, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    /// Builds a Gemini-backed client, or an unconfigured one if the key is
    /// missing.
    pub fn from_config(config: &AdvisoryConfig) -> Self {
        let endpoint = GeminiEndpoint::from_config(config)
            .map(|endpoint| Arc::new(endpoint) as Arc<dyn GenerativeEndpoint>);
        if endpoint.is_none() {
            tracing::warn!("no generative API key configured; advisory calls will use fallbacks");
        }
        Self::new(endpoint, config.request_timeout())
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn call(&self, request: GenerateRequest) -> Result<GenerateResponse, AdvisoryError> {
        let endpoint = self.endpoint.as_ref().ok_or(AdvisoryError::MissingApiKey)?;
        bounded(self.timeout, endpoint.generate(request)).await
    }

    pub async fn financial_advice(
        &self,
        accounts: &[Account],
        transactions: &[Transaction],
    ) -> String {
        let summary = FinancialSummary::from_ledger(accounts, transactions);
        let request = GenerateRequest::text(prompt::advice_prompt(&summary));
        match self.call(request).await {
            Ok(response) if !response.text.trim().is_empty() => response.text,
            Ok(_) => {
                tracing::warn!("advice endpoint returned an empty answer");
                ADVICE_EMPTY.to_string()
            }
            Err(AdvisoryError::MissingApiKey) => ADVICE_NOT_CONFIGURED.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "financial advice unavailable");
                ADVICE_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn daily_inspiration(&self) -> String {
        match self.call(GenerateRequest::text(prompt::INSPIRATION_PROMPT)).await {
            Ok(response) if !response.text.trim().is_empty() => response.text.trim().to_string(),
            Ok(_) | Err(AdvisoryError::MissingApiKey) => pick_inspiration(),
            Err(err) => {
                tracing::warn!(error = %err, "daily inspiration unavailable");
                pick_inspiration()
            }
        }
    }

    pub async fn market_snapshot(&self) -> MarketSnapshot {
        let request = GenerateRequest::json(prompt::MARKET_PROMPT, market::market_schema())
            .with_search_grounding();
        let result = self
            .call(request)
            .await
            .and_then(|response| market::parse_market_snapshot(&response.text, response.sources));
        match result {
            Ok(snapshot) => snapshot,
            Err(AdvisoryError::MissingApiKey) => fallback_market_snapshot(),
            Err(err) => {
                tracing::warn!(error = %err, "market snapshot unavailable");
                fallback_market_snapshot()
            }
        }
    }
}

async fn bounded<F>(limit: Duration, call: F) -> Result<GenerateResponse, AdvisoryError>
where
    F: Future<Output = Result<GenerateResponse, AdvisoryError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AdvisoryError::Timeout)?
}

fn pick_inspiration() -> String {
    let index = rand::rng().random_range(0..INSPIRATION_FALLBACKS.len());
    INSPIRATION_FALLBACKS[index].to_string()
}
