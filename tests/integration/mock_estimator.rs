//! Mock estimator for integration testing.
//!
//! Provides a deterministic `ProbabilityEstimator` that answers from a
//! fixed table keyed by home team, records every call, and can be forced
//! to fail. Everything is in-memory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use accumulator::llm::{OutcomeProbabilities, ProbabilityEstimator};
use accumulator::types::{Match, MatchId};

pub struct MockEstimator {
    answers: HashMap<String, OutcomeProbabilities>,
    calls: Arc<Mutex<Vec<MatchId>>>,
    /// If set, every call returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockEstimator {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Answer `probs` for the match whose home team is `home`.
    pub fn with_answer(mut self, home: &str, probs: OutcomeProbabilities) -> Self {
        self.answers.insert(home.to_string(), probs);
        self
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn calls(&self) -> Vec<MatchId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProbabilityEstimator for MockEstimator {
    async fn estimate(&self, id: MatchId, fixture: &Match) -> Result<Option<OutcomeProbabilities>> {
        self.calls.lock().unwrap().push(id);
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(self.answers.get(&fixture.home).cloned())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
