//! Persistence layer.
//!
//! Append-only run log kept as a pretty-printed JSON array. Each run that
//! produces a selection appends one `LogEntry`; outcomes (`won`) are filled
//! in later by hand or by a settlement tool.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{AccumulatorError, Outcome, SelectionPass, SelectionSet, TargetStatus, REPORT_PRECISION};

/// Default log file path.
pub const DEFAULT_LOG_FILE: &str = "accumulator_log.json";

/// One leg as recorded in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedLeg {
    pub home: String,
    pub away: String,
    pub outcome: Outcome,
    pub odds: f64,
    #[serde(default = "default_pass")]
    pub pass: SelectionPass,
}

fn default_pass() -> SelectionPass {
    SelectionPass::Primary
}

/// One run's accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default = "Uuid::new_v4")]
    pub run_id: Uuid,
    /// Older logs carry naive ISO-8601 timestamps; those are read as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub accumulator: Vec<LoggedLeg>,
    pub total_odds: Decimal,
    pub stake: Decimal,
    /// `None` until the accumulator settles.
    pub won: Option<bool>,
    #[serde(default)]
    pub status: Option<TargetStatus>,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// RFC 3339 first, then a naive `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

impl LogEntry {
    pub fn from_selection(
        set: &SelectionSet,
        status: TargetStatus,
        stake: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        // Same figure the selection reports; the second rounding only
        // strips float conversion noise.
        let total_odds = Decimal::from_f64(set.reported_product())
            .map(|d| d.round_dp(REPORT_PRECISION))
            .unwrap_or(Decimal::ONE);
        LogEntry {
            run_id: Uuid::new_v4(),
            timestamp,
            accumulator: set
                .legs()
                .iter()
                .map(|leg| LoggedLeg {
                    home: leg.candidate.home.clone(),
                    away: leg.candidate.away.clone(),
                    outcome: leg.candidate.outcome,
                    odds: leg.candidate.price,
                    pass: leg.pass,
                })
                .collect(),
            total_odds,
            stake,
            won: None,
            status: Some(status),
        }
    }
}

/// Read every entry. A missing file is an empty log.
pub fn read_log(path: &str) -> Result<Vec<LogEntry>> {
    if !Path::new(path).exists() {
        debug!(path, "No run log yet");
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read run log from {path}"))?;
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<LogEntry> = serde_json::from_str(&json)
        .context(format!("Failed to parse run log from {path}"))?;
    Ok(entries)
}

/// Append one entry and rewrite the file. Returns the new entry count.
pub fn append_entry(path: &str, entry: &LogEntry) -> Result<usize> {
    let mut entries = read_log(path)?;
    entries.push(entry.clone());

    let json = serde_json::to_string_pretty(&entries)
        .context("Failed to serialise run log")?;
    std::fs::write(path, json)
        .map_err(|e| AccumulatorError::Storage(format!("failed to write {path}: {e}")))?;

    info!(
        path,
        run_id = %entry.run_id,
        total_odds = %entry.total_odds,
        entries = entries.len(),
        "Run logged"
    );
    Ok(entries.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
