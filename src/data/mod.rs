//! Match data sources.
//!
//! Defines the `MatchSource` trait the job pulls its snapshot from, and a
//! JSON file implementation for feeds dumped to disk by an external
//! collector.

pub mod file;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Match;

/// Abstraction over upstream match/price feeds.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Fetch the current list of matches with their prices.
    async fn fetch_matches(&self) -> Result<Vec<Match>>;

    /// Human-readable source name for logs.
    fn name(&self) -> String;
}
