//! Model-based probability estimation for enrichment.
//!
//! Defines the `ProbabilityEstimator` trait and the outcome-keyed
//! probability map it returns. The HuggingFace Inference API client is the
//! only concrete estimator; tests use in-memory mocks.

pub mod huggingface;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Match, MatchId, Outcome};

/// Abstraction over external probability estimators.
///
/// Returning `Ok(None)` means the model had nothing usable to say about this
/// match. Callers treat errors the same way: the match keeps its
/// price-derived scores.
#[async_trait]
pub trait ProbabilityEstimator: Send + Sync {
    async fn estimate(&self, id: MatchId, fixture: &Match) -> Result<Option<OutcomeProbabilities>>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}

/// Model probabilities for one match, keyed by outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    probs: HashMap<Outcome, f64>,
}

impl OutcomeProbabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, outcome: Outcome, probability: f64) -> Self {
        self.probs.insert(outcome, probability);
        self
    }

    /// Usable probability for an outcome.
    ///
    /// Non-finite and non-positive values are treated as missing. Values
    /// above 1.0 are returned unchanged.
    pub fn get(&self, outcome: Outcome) -> Option<f64> {
        self.probs
            .get(&outcome)
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}

impl FromIterator<(Outcome, f64)> for OutcomeProbabilities {
    fn from_iter<I: IntoIterator<Item = (Outcome, f64)>>(iter: I) -> Self {
        Self {
            probs: iter.into_iter().collect(),
        }
    }
}

/// Pull every number out of free text, in order of appearance.
///
/// Accepts integers and decimals (`.75`, `0.75`, `75`); a trailing `%` is
/// left for the caller to interpret.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    let mut out = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() || (c == '.' && !num_str.contains('.')) {
                    num_str.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if let Ok(v) = num_str.parse::<f64>() {
                out.push(v);
            }
        } else {
            chars.next();
        }
    }
    out
}

/// Map the first numbers in `text` onto `outcomes`, in order.
///
/// If any of the taken values exceeds 1.0 they are all read as
/// percentages. Returns `None` when the text holds fewer numbers than
/// there are outcomes.
pub fn parse_probabilities(text: &str, outcomes: &[Outcome]) -> Option<OutcomeProbabilities> {
    if outcomes.is_empty() {
        return None;
    }
    let mut nums = extract_numbers(text);
    if nums.len() < outcomes.len() {
        return None;
    }
    nums.truncate(outcomes.len());
    if nums.iter().any(|v| *v > 1.0) {
        for v in nums.iter_mut() {
            *v /= 100.0;
        }
    }
    Some(outcomes.iter().copied().zip(nums).collect())
}
