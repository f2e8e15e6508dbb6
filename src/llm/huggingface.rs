//! HuggingFace Inference API integration.
//!
//! Sends a short text prompt describing the match and its prices, then
//! reads outcome probabilities back out of whatever text the model returns.
//! Most hosted models do not emit structured JSON, so parsing is lenient
//! and a miss is reported as `Ok(None)` rather than an error.
//!
//! API: `POST https://api-inference.huggingface.co/models/{model}`
//! Auth: `Authorization: Bearer <token>`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{parse_probabilities, OutcomeProbabilities, ProbabilityEstimator};
use crate::types::{AccumulatorError, Match, MatchId, Outcome};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const HF_API_BASE: &str = "https://api-inference.huggingface.co/models";

const DEFAULT_TIMEOUT_SECS: u64 = 20;

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HuggingFaceClient {
    http: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl HuggingFaceClient {
    pub fn new(api_key: SecretString, model: String, timeout_secs: Option<u64>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(
                timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .user_agent("accumulator/0.1.0")
            .build()
            .context("Failed to build HuggingFace HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: HF_API_BASE.to_string(),
        })
    }

    /// Point the client at a different inference host (self-hosted endpoints).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.model)
    }

    /// Prompt text for one match.
    pub fn build_prompt(fixture: &Match) -> String {
        let prices: Vec<String> = fixture
            .odds
            .iter()
            .filter_map(|q| q.price.parse().map(|p| format!("{} {p}", q.outcome)))
            .collect();
        let keys: Vec<String> = fixture
            .odds
            .iter()
            .map(|q| format!("'{}'", q.outcome))
            .collect();
        format!(
            "Match: {} vs {}\nOdds: {}\nReturn a JSON object with keys {} containing probability values (0-1).",
            fixture.home,
            fixture.away,
            prices.join(", "),
            keys.join(","),
        )
    }

    /// Pull the generated text out of an inference response body.
    ///
    /// Returns `None` for error payloads.
    pub fn response_text(body: &Value) -> Option<String> {
        match body {
            Value::Object(map) if map.contains_key("error") => None,
            Value::Array(items) => {
                let first = items.first()?;
                let text = first
                    .get("generated_text")
                    .or_else(|| first.get("text"))
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| first.to_string());
                Some(text)
            }
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[async_trait]
impl ProbabilityEstimator for HuggingFaceClient {
    async fn estimate(&self, id: MatchId, fixture: &Match) -> Result<Option<OutcomeProbabilities>> {
        let request = InferenceRequest {
            inputs: Self::build_prompt(fixture),
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| AccumulatorError::Estimator {
                model: self.model.clone(),
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AccumulatorError::Estimator {
                model: self.model.clone(),
                message: format!("HTTP {status}: {error_text}"),
            }
            .into());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse HuggingFace response")?;

        let Some(text) = Self::response_text(&body) else {
            warn!(match_id = %id, model = %self.model, "Model returned an error payload");
            return Ok(None);
        };

        let outcomes: Vec<Outcome> = fixture.odds.iter().map(|q| q.outcome).collect();
        let parsed = parse_probabilities(&text, &outcomes);
        debug!(
            match_id = %id,
            model = %self.model,
            parsed = parsed.is_some(),
            "HuggingFace response parsed"
        );
        Ok(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
