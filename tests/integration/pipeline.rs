//! End-to-end pipeline scenarios: snapshot → candidates → enrichment →
//! selection → run log.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;

use accumulator::data::file::JsonFileSource;
use accumulator::data::MatchSource;
use accumulator::engine::accountant::WeeklySummary;
use accumulator::engine::candidates::build_candidates;
use accumulator::engine::enricher::Enricher;
use accumulator::engine::job::AccumulatorJob;
use accumulator::engine::selector::{Selector, SelectorConfig};
use accumulator::llm::OutcomeProbabilities;
use accumulator::storage;
use accumulator::types::*;

use crate::mock_estimator::MockEstimator;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct StaticSource(Vec<Match>);

#[async_trait]
impl MatchSource for StaticSource {
    async fn fetch_matches(&self) -> Result<Vec<Match>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> String {
        "static".to_string()
    }
}

fn one_x_two(home: &str, away: &str, h: f64, d: f64, a: f64) -> Match {
    Match::new(
        home,
        away,
        vec![
            (Outcome::Home, h.into()),
            (Outcome::Draw, d.into()),
            (Outcome::Away, a.into()),
        ],
    )
}

fn selector(cfg: SelectorConfig) -> Selector {
    Selector::new(cfg).unwrap()
}

fn job(cfg: SelectorConfig) -> AccumulatorJob {
    AccumulatorJob::new(selector(cfg), 60, dec!(100))
}

fn temp_path(tag: &str) -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("accumulator_it_{tag}_{}.json", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

/// Small deterministic generator so property checks need no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn price(&mut self) -> f64 {
        // 0.9 .. 6.0, so some prices are non-viable
        ((0.9 + self.next_f64() * 5.1) * 100.0).round() / 100.0
    }
}

fn random_pool(seed: u64, matches: usize) -> Vec<Match> {
    let mut rng = Lcg(seed);
    (0..matches)
        .map(|i| {
            one_x_two(
                &format!("Home{i}"),
                &format!("Away{i}"),
                rng.price(),
                rng.price(),
                rng.price(),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Spec scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_match_is_pool_limited() {
    let source = StaticSource(vec![one_x_two("Alpha", "Beta", 2.0, 3.4, 4.1)]);
    let cfg = SelectorConfig {
        target_min: 3.0,
        target_max: 4.0,
        legs_min: 3,
        legs_max: 4,
        min_leg_price: None,
    };
    let report = job(cfg).run(&source, Utc::now()).await.unwrap();
    assert!(report.selection.len() <= 1);
    assert_eq!(report.candidates, 3);
    assert_eq!(report.status, TargetStatus::BelowTarget);
}

#[tokio::test]
async fn test_below_target_returned_as_is() {
    let source = StaticSource(
        (0..4)
            .map(|i| Match::new(&format!("H{i}"), &format!("A{i}"), vec![(Outcome::Home, 1.3.into())]))
            .collect(),
    );
    let report = job(SelectorConfig::default()).run(&source, Utc::now()).await.unwrap();
    assert_eq!(report.selection.len(), 4);
    assert_eq!(report.selection.reported_product(), 2.856);
    assert_eq!(report.status, TargetStatus::BelowTarget);
    let entry = report.entry.expect("below-target sets are still logged");
    assert_eq!(entry.total_odds, dec!(2.856));
    let order: Vec<_> = entry.accumulator.iter().map(|l| l.home.as_str()).collect();
    assert_eq!(order, vec!["H0", "H1", "H2", "H3"]);
}

#[tokio::test]
async fn test_enrichment_override_takes_precedence() {
    let matches = vec![
        Match::new("Override FC", "X", vec![(Outcome::Home, 2.0.into())]),
        Match::new("Favourite", "Y", vec![(Outcome::Home, 1.6.into())]),
    ];
    let cfg = SelectorConfig { legs_min: 1, legs_max: 1, ..Default::default() };

    let plain = job(cfg.clone())
        .run(&StaticSource(matches.clone()), Utc::now())
        .await
        .unwrap();
    assert_eq!(plain.selection.legs()[0].candidate.home, "Favourite");

    let estimator = Arc::new(
        MockEstimator::new()
            .with_answer("Override FC", OutcomeProbabilities::new().with(Outcome::Home, 0.9)),
    );
    let enriched = job(cfg)
        .with_enricher(Enricher::new(estimator.clone()))
        .run(&StaticSource(matches), Utc::now())
        .await
        .unwrap();
    let leg = &enriched.selection.legs()[0].candidate;
    assert_eq!(leg.home, "Override FC");
    assert_eq!(leg.effective_score(), 0.9);
    assert_eq!(leg.implied_probability, 0.5);
    assert_eq!(estimator.calls(), vec![MatchId(0), MatchId(1)]);
}

#[tokio::test]
async fn test_non_viable_match_is_absent() {
    let source = StaticSource(vec![
        one_x_two("Dead", "Rubber", 1.01, 1.0, 1.005),
        one_x_two("A", "B", 1.5, 4.0, 6.0),
        one_x_two("C", "D", 1.5, 4.0, 6.0),
        one_x_two("E", "F", 1.5, 4.0, 6.0),
    ]);
    let report = job(SelectorConfig::default()).run(&source, Utc::now()).await.unwrap();
    assert_eq!(report.candidates, 9);
    assert!(report.selection.candidates().all(|c| c.home != "Dead"));
    assert_eq!(report.selection.len(), 3);
    assert_eq!(report.status, TargetStatus::InRange);
}

#[tokio::test]
async fn test_empty_snapshot_is_not_an_error() {
    let report = job(SelectorConfig::default())
        .run(&StaticSource(Vec::new()), Utc::now())
        .await
        .unwrap();
    assert!(report.selection.is_empty());
    assert_eq!(report.selection.reported_product(), 1.0);
    assert!(report.entry.is_none());
}

// ---------------------------------------------------------------------------
// Enrichment failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failing_estimator_matches_plain_run() {
    let matches = random_pool(7, 12);
    let plain = job(SelectorConfig::default())
        .run(&StaticSource(matches.clone()), Utc::now())
        .await
        .unwrap();

    let estimator = Arc::new(MockEstimator::new());
    estimator.set_error("service unreachable");
    let enriched = job(SelectorConfig::default())
        .with_enricher(Enricher::new(estimator.clone()).with_max_calls(4))
        .run(&StaticSource(matches), Utc::now())
        .await
        .unwrap();

    assert_eq!(plain.selection, enriched.selection);
    assert_eq!(estimator.calls().len(), 4);
    let stats = enriched.enrichment.unwrap();
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.overrides, 0);
}

// ---------------------------------------------------------------------------
// Properties over generated pools
// ---------------------------------------------------------------------------

#[test]
fn test_selection_properties_hold_across_pools() {
    let configs = [
        SelectorConfig::default(),
        SelectorConfig { target_min: 5.0, target_max: 8.0, legs_min: 2, legs_max: 5, min_leg_price: None },
        SelectorConfig { target_min: 1.5, target_max: 2.0, legs_min: 1, legs_max: 2, min_leg_price: Some(1.25) },
    ];

    for seed in 0..200u64 {
        let size = (seed % 9) as usize;
        let matches = random_pool(seed, size);
        let candidates = build_candidates(&matches);

        let viable: usize = matches
            .iter()
            .flat_map(|m| m.odds.iter())
            .filter(|q| q.price.parse().map_or(false, |p| p > MIN_VIABLE_PRICE))
            .count();
        assert_eq!(candidates.len(), viable);
        for c in &candidates {
            assert!(c.price > MIN_VIABLE_PRICE);
            assert!(c.effective_score() > 0.0 && c.effective_score() <= 1.0);
        }

        let distinct: HashSet<MatchId> = candidates.iter().map(|c| c.match_id).collect();

        for cfg in &configs {
            let sel = selector(cfg.clone());
            let set = sel.select(&candidates);

            let ids: Vec<MatchId> = set.candidates().map(|c| c.match_id).collect();
            let unique: HashSet<MatchId> = ids.iter().copied().collect();
            assert_eq!(ids.len(), unique.len(), "seed {seed}: duplicate match");

            assert!(set.len() <= cfg.legs_max, "seed {seed}: over legs_max");
            if cfg.min_leg_price.is_none() && distinct.len() >= cfg.legs_min {
                assert!(set.len() >= cfg.legs_min, "seed {seed}: under legs_min");
            }

            let rebuilt: f64 = set.candidates().map(|c| c.price).product();
            assert!(
                (set.reported_product() - rebuilt).abs() <= 0.0005 + 1e-9,
                "seed {seed}: reported product drifted"
            );

            assert_eq!(set, sel.select(&candidates), "seed {seed}: non-deterministic");
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot file → run log → weekly summary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_file_source_to_run_log() {
    let snapshot_path = temp_path("snapshot");
    let log_path = temp_path("log");
    std::fs::write(
        &snapshot_path,
        r#"{"matches": [
            {"home": "A", "away": "B", "odds": [{"outcome": "home", "price": "1,50"}, {"outcome": "away", "price": 5.0}]},
            {"home": "C", "away": "D", "odds": [{"outcome": "home", "price": 1.5}, {"outcome": "draw", "price": "n/a"}]},
            {"home": "E", "away": "F", "odds": [{"outcome": "over", "price": "1/2"}, {"outcome": "under", "price": 2.6}]}
        ]}"#,
    )
    .unwrap();

    let source = JsonFileSource::new(&snapshot_path);
    let report = job(SelectorConfig::default()).run(&source, Utc::now()).await.unwrap();
    assert_eq!(report.matches_scanned, 3);
    assert_eq!(report.candidates, 5);
    assert_eq!(report.status, TargetStatus::InRange);
    assert_eq!(report.selection.reported_product(), 3.375);

    let mut entry = report.entry.unwrap();
    storage::append_entry(&log_path, &entry).unwrap();
    entry.won = Some(true);
    storage::append_entry(&log_path, &entry).unwrap();

    let logs = storage::read_log(&log_path).unwrap();
    assert_eq!(logs.len(), 2);
    let summary = WeeklySummary::from_logs(&logs, Utc::now(), dec!(100));
    assert_eq!(summary.total, 2);
    assert_eq!(summary.wins, 1);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.balance, dec!(337.5));

    std::fs::remove_file(&snapshot_path).unwrap();
    std::fs::remove_file(&log_path).unwrap();
}
