//! ACCUMULATOR: single-run job.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! reads the match snapshot, builds one accumulator, appends it to the
//! run log, and prints the picks with a weekly summary. Designed to be
//! invoked from cron; each invocation is one independent run.

use anyhow::Result;
use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use accumulator::config::{self, EnrichmentConfig};
use accumulator::data::file::JsonFileSource;
use accumulator::engine::accountant::WeeklySummary;
use accumulator::engine::enricher::Enricher;
use accumulator::engine::job::{AccumulatorJob, RunReport};
use accumulator::engine::selector::Selector;
use accumulator::llm::huggingface::HuggingFaceClient;
use accumulator::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ACCUMULATOR_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        target_min = cfg.selection.target_min,
        target_max = cfg.selection.target_max,
        legs_min = cfg.selection.legs_min,
        legs_max = cfg.selection.legs_max,
        "Accumulator run starting"
    );

    let selector = Selector::new(cfg.selection.clone())?;
    let mut job = AccumulatorJob::new(selector, cfg.source.limit, cfg.bankroll.stake());
    if let Some(enricher) = build_enricher(&cfg.enrichment)? {
        job = job.with_enricher(enricher);
    }

    let source = JsonFileSource::new(&cfg.source.path);
    let now = Utc::now();
    let report = job.run(&source, now).await?;
    log_run_report(&report);

    let Some(entry) = report.entry.as_ref() else {
        info!("No accumulator could be built.");
        return Ok(());
    };

    storage::append_entry(&cfg.storage.log_file, entry)?;
    let logs = storage::read_log(&cfg.storage.log_file)?;
    let summary = WeeklySummary::from_logs(&logs, now, cfg.bankroll.start_bankroll);

    println!("Accumulator generated (UTC {}):\n", entry.timestamp.to_rfc3339());
    println!("{}", report.selection);
    println!("Stake: {}\n", entry.stake);
    println!("{summary}");

    Ok(())
}

/// Build the optional enricher. Missing credentials disable enrichment
/// with a warning rather than failing the run.
fn build_enricher(cfg: &EnrichmentConfig) -> Result<Option<Enricher>> {
    if !cfg.enabled {
        return Ok(None);
    }
    if cfg.provider != "huggingface" {
        warn!(provider = %cfg.provider, "Unknown enrichment provider, enrichment disabled");
        return Ok(None);
    }
    let Some(model) = cfg.model.clone() else {
        warn!("No enrichment model configured (set HF_MODEL), enrichment disabled");
        return Ok(None);
    };
    let api_key = match config::AppConfig::resolve_env(&cfg.api_key_env) {
        Ok(key) if !key.is_empty() => SecretString::new(key),
        _ => {
            warn!(env = %cfg.api_key_env, "No inference API key, enrichment disabled");
            return Ok(None);
        }
    };

    info!(model = %model, max_calls = cfg.max_calls, "Using HuggingFace enrichment");
    let client = HuggingFaceClient::new(api_key, model, Some(cfg.timeout_secs))?;
    Ok(Some(
        Enricher::new(Arc::new(client))
            .with_max_calls(cfg.max_calls)
            .with_concurrency(cfg.concurrency)
            .with_call_timeout(Duration::from_secs(cfg.timeout_secs + 5)),
    ))
}

fn log_run_report(report: &RunReport) {
    let (attempted, overrides) = report
        .enrichment
        .as_ref()
        .map(|s| (s.attempted, s.overrides))
        .unwrap_or((0, 0));
    info!(
        scanned = report.matches_scanned,
        candidates = report.candidates,
        enrichment_calls = attempted,
        overrides,
        legs = report.selection.len(),
        total_odds = report.selection.reported_product(),
        status = %report.status,
        "Run complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("accumulator=info"));

    let json_logging = std::env::var("ACCUMULATOR_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
