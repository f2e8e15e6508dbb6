//! One accumulator run: source → candidates → enrichment → selection.
//!
//! The job owns nothing mutable across runs. Each call to `run` takes a
//! fresh snapshot from the source and returns a `RunReport` the caller can
//! log, persist, or deliver however it likes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::data::MatchSource;
use crate::engine::candidates::build_candidates;
use crate::engine::enricher::{EnrichmentStats, Enricher};
use crate::engine::selector::Selector;
use crate::storage::LogEntry;
use crate::types::{SelectionSet, TargetStatus};

/// Summary of a complete run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub matches_scanned: usize,
    pub candidates: usize,
    pub enrichment: Option<EnrichmentStats>,
    pub selection: SelectionSet,
    pub status: TargetStatus,
    /// `None` when nothing was selected.
    pub entry: Option<LogEntry>,
}

pub struct AccumulatorJob {
    selector: Selector,
    enricher: Option<Enricher>,
    match_limit: usize,
    stake: Decimal,
}

impl AccumulatorJob {
    pub fn new(selector: Selector, match_limit: usize, stake: Decimal) -> Self {
        Self {
            selector,
            enricher: None,
            match_limit,
            stake,
        }
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub async fn run(&self, source: &dyn MatchSource, now: DateTime<Utc>) -> Result<RunReport> {
        let mut matches = source
            .fetch_matches()
            .await
            .with_context(|| format!("Failed to fetch matches from {}", source.name()))?;
        if matches.len() > self.match_limit {
            matches.truncate(self.match_limit);
        }
        info!(source = %source.name(), count = matches.len(), "Matches scanned");

        let candidates = build_candidates(&matches);

        let (candidates, enrichment) = match &self.enricher {
            Some(enricher) => {
                let (scored, stats) = enricher.enrich(&matches, &candidates).await;
                (scored, Some(stats))
            }
            None => (candidates, None),
        };

        let selection = self.selector.select(&candidates);
        let status = self.selector.status(&selection);

        let entry = (!selection.is_empty())
            .then(|| LogEntry::from_selection(&selection, status, self.stake, now));

        Ok(RunReport {
            matches_scanned: matches.len(),
            candidates: candidates.len(),
            enrichment,
            selection,
            status,
            entry,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
