//! JSON file match source.
//!
//! Reads a snapshot written by whatever collects prices upstream. Accepts
//! either a bare array of matches or an object with a `matches` array, so
//! collector metadata can sit alongside the data.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::MatchSource;
use crate::types::{AccumulatorError, Match};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Bare(Vec<Match>),
    Wrapped { matches: Vec<Match> },
}

pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(json: &str) -> Result<Vec<Match>> {
        let snapshot: Snapshot =
            serde_json::from_str(json).context("Failed to parse match snapshot")?;
        Ok(match snapshot {
            Snapshot::Bare(matches) => matches,
            Snapshot::Wrapped { matches } => matches,
        })
    }
}

#[async_trait]
impl MatchSource for JsonFileSource {
    async fn fetch_matches(&self) -> Result<Vec<Match>> {
        let path_str = self.path.display().to_string();
        debug!(path = %path_str, "Reading match snapshot");

        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AccumulatorError::Source {
                source_name: self.name(),
                message: format!("{path_str}: {e}"),
            })?;

        let matches = Self::parse(&json).with_context(|| format!("Bad snapshot in {path_str}"))?;
        info!(path = %path_str, count = matches.len(), "Matches loaded");
        Ok(matches)
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
