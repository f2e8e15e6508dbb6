//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the inference API token) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`. A handful of env
//! vars override file values so cron hosts can tune a run without editing
//! the file.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::str::FromStr;

use crate::engine::selector::SelectorConfig;
use crate::storage::DEFAULT_LOG_FILE;
use crate::types::AccumulatorError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub selection: SelectorConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bankroll: BankrollConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Path to the JSON match snapshot.
    pub path: String,
    /// Maximum matches taken from the snapshot.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    pub api_key_env: String,
    /// Cap on estimator calls per run.
    pub max_calls: usize,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "huggingface".to_string(),
            model: None,
            api_key_env: "HF_API_KEY".to_string(),
            max_calls: 6,
            concurrency: 1,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub log_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BankrollConfig {
    pub start_bankroll: Decimal,
    /// Stake per accumulator; defaults to the starting bankroll.
    #[serde(default)]
    pub stake: Option<Decimal>,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            start_bankroll: dec!(1000),
            stake: None,
        }
    }
}

impl BankrollConfig {
    pub fn stake(&self) -> Decimal {
        self.stake.unwrap_or(self.start_bankroll)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let mut config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// `HF_MODEL`, `START_BANKROLL` and `STAKE` take precedence over the file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(model) = std::env::var("HF_MODEL") {
            if !model.trim().is_empty() {
                self.enrichment.model = Some(model.trim().to_string());
            }
        }
        if let Ok(v) = std::env::var("START_BANKROLL") {
            self.bankroll.start_bankroll = Decimal::from_str(v.trim())
                .with_context(|| format!("Invalid START_BANKROLL: {v}"))?;
        }
        if let Ok(v) = std::env::var("STAKE") {
            self.bankroll.stake = Some(
                Decimal::from_str(v.trim()).with_context(|| format!("Invalid STAKE: {v}"))?,
            );
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AccumulatorError> {
        self.selection.validate()?;
        if self.source.limit == 0 {
            return Err(AccumulatorError::Config("source.limit must be at least 1".into()));
        }
        if self.enrichment.enabled && self.enrichment.concurrency == 0 {
            return Err(AccumulatorError::Config(
                "enrichment.concurrency must be at least 1".into(),
            ));
        }
        if self.bankroll.start_bankroll <= Decimal::ZERO {
            return Err(AccumulatorError::Config("bankroll.start_bankroll must be positive".into()));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
