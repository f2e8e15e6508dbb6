//! Model enrichment of candidate scores.
//!
//! Asks a `ProbabilityEstimator` about at most `max_calls` matches per run
//! and turns the answers into `ScoreOverrides`. Every failure mode (error,
//! timeout, empty answer, missing outcome key) leaves the affected
//! candidates on their implied-probability score. Nothing here returns an
//! error to the caller.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm::{OutcomeProbabilities, ProbabilityEstimator};
use crate::types::{Candidate, Match, MatchId, Outcome};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default cap on estimator calls per run.
pub const DEFAULT_MAX_CALLS: usize = 6;

const DEFAULT_CONCURRENCY: usize = 1;

const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Model probabilities keyed by (match, outcome).
#[derive(Debug, Clone, Default)]
pub struct ScoreOverrides {
    scores: HashMap<(MatchId, Outcome), f64>,
}

impl ScoreOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: MatchId, outcome: Outcome, probability: f64) {
        self.scores.insert((id, outcome), probability);
    }

    /// Record every usable outcome probability for one match.
    pub fn extend_match(&mut self, id: MatchId, probs: &OutcomeProbabilities, outcomes: &[Outcome]) {
        for outcome in outcomes {
            if let Some(p) = probs.get(*outcome) {
                self.insert(id, *outcome, p);
            }
        }
    }

    pub fn get(&self, id: MatchId, outcome: Outcome) -> Option<f64> {
        self.scores.get(&(id, outcome)).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// New candidate vector with overrides applied; the input is untouched.
    pub fn apply(&self, candidates: &[Candidate]) -> Vec<Candidate> {
        candidates
            .iter()
            .map(|c| match self.get(c.match_id, c.outcome) {
                Some(p) => c.with_model_probability(p),
                None => c.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Per-run enrichment statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub empty: usize,
    pub overrides: usize,
}

pub struct Enricher {
    estimator: Arc<dyn ProbabilityEstimator>,
    max_calls: usize,
    concurrency: usize,
    call_timeout: Duration,
}

impl Enricher {
    pub fn new(estimator: Arc<dyn ProbabilityEstimator>) -> Self {
        Self {
            estimator,
            max_calls: DEFAULT_MAX_CALLS,
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = max_calls;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Query the estimator for up to `max_calls` matches that have
    /// candidates, in match order.
    pub async fn score_overrides(
        &self,
        matches: &[Match],
        candidates: &[Candidate],
    ) -> (ScoreOverrides, EnrichmentStats) {
        let mut stats = EnrichmentStats::default();
        let mut overrides = ScoreOverrides::new();

        let targets: Vec<MatchId> = candidates
            .iter()
            .map(|c| c.match_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|id| id.0 < matches.len())
            .take(self.max_calls)
            .collect();

        if targets.is_empty() {
            return (overrides, stats);
        }

        info!(
            model = %self.estimator.model_name(),
            matches = targets.len(),
            cap = self.max_calls,
            "Starting enrichment"
        );

        let results: Vec<(MatchId, Option<OutcomeProbabilities>)> = stream::iter(targets)
            .map(|id| async move { (id, self.estimate_one(id, &matches[id.0]).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (id, result) in results {
            stats.attempted += 1;
            match result {
                Some(probs) if !probs.is_empty() => {
                    stats.succeeded += 1;
                    let outcomes: Vec<Outcome> = candidates
                        .iter()
                        .filter(|c| c.match_id == id)
                        .map(|c| c.outcome)
                        .collect();
                    let before = overrides.len();
                    overrides.extend_match(id, &probs, &outcomes);
                    debug!(
                        match_id = %id,
                        applied = overrides.len() - before,
                        "Model probabilities recorded"
                    );
                }
                Some(_) => stats.empty += 1,
                None => stats.failed += 1,
            }
        }
        stats.overrides = overrides.len();

        info!(
            attempted = stats.attempted,
            succeeded = stats.succeeded,
            failed = stats.failed,
            empty = stats.empty,
            overrides = stats.overrides,
            "Enrichment complete"
        );

        (overrides, stats)
    }

    /// `Some(probs)` on any answer (possibly empty), `None` on failure or no answer.
    async fn estimate_one(&self, id: MatchId, fixture: &Match) -> Option<OutcomeProbabilities> {
        match tokio::time::timeout(self.call_timeout, self.estimator.estimate(id, fixture)).await {
            Ok(Ok(Some(probs))) => Some(probs),
            Ok(Ok(None)) => {
                debug!(match_id = %id, "Estimator returned no probabilities");
                None
            }
            Ok(Err(e)) => {
                warn!(match_id = %id, error = %e, "Estimator call failed, keeping implied scores");
                None
            }
            Err(_) => {
                warn!(
                    match_id = %id,
                    timeout_secs = self.call_timeout.as_secs_f64(),
                    "Estimator call timed out, keeping implied scores"
                );
                None
            }
        }
    }

    /// Compute overrides and return the re-scored candidates.
    pub async fn enrich(
        &self,
        matches: &[Match],
        candidates: &[Candidate],
    ) -> (Vec<Candidate>, EnrichmentStats) {
        let (overrides, stats) = self.score_overrides(matches, candidates).await;
        (overrides.apply(candidates), stats)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
