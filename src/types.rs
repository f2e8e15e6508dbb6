//! Shared types for the accumulator job.
//!
//! These types form the data model used across all modules: the
//! source-provided `Match`, the flat `Candidate` records the builder derives
//! from it, and the `SelectionSet` the selector hands back to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed price at or below this is treated as non-viable.
pub const MIN_VIABLE_PRICE: f64 = 1.01;

/// Decimal places used when reporting the combined product.
pub const REPORT_PRECISION: u32 = 3;

// ---------------------------------------------------------------------------
// Match (source data)
// ---------------------------------------------------------------------------

/// Position of a match in the run snapshot.
///
/// Stable for the whole run; exclusivity and enrichment are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub usize);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome label within a match market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
    Over,
    Under,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
            Outcome::Over => "over",
            Outcome::Under => "under",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "1" => Ok(Outcome::Home),
            "draw" | "x" => Ok(Outcome::Draw),
            "away" | "2" => Ok(Outcome::Away),
            "over" => Ok(Outcome::Over),
            "under" => Ok(Outcome::Under),
            _ => Err(anyhow::anyhow!("Unknown outcome label: {s}")),
        }
    }
}

/// A price as it arrived from the feed: either a number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Decimal(f64),
    Text(String),
}

impl RawPrice {
    /// Parse into a decimal price.
    ///
    /// Text accepts `,` as the decimal separator and fractional odds
    /// (`5/2` reads as `3.5`). Returns `None` for anything non-numeric,
    /// non-finite, or non-positive.
    pub fn parse(&self) -> Option<f64> {
        let value = match self {
            RawPrice::Decimal(v) => *v,
            RawPrice::Text(text) => Self::parse_text(text)?,
        };
        (value.is_finite() && value > 0.0).then_some(value)
    }

    fn parse_text(text: &str) -> Option<f64> {
        let cleaned = text.trim().replace(',', ".");
        if let Ok(v) = cleaned.parse::<f64>() {
            return Some(v);
        }
        let (num, den) = cleaned.split_once('/')?;
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        Some(((1.0 + num / den) * 100.0).round() / 100.0)
    }
}

impl From<f64> for RawPrice {
    fn from(v: f64) -> Self {
        RawPrice::Decimal(v)
    }
}

impl From<&str> for RawPrice {
    fn from(s: &str) -> Self {
        RawPrice::Text(s.to_string())
    }
}

/// One declared outcome and its price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub outcome: Outcome,
    pub price: RawPrice,
}

/// A fixture with per-outcome prices, in the order the source declared them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub home: String,
    pub away: String,
    pub odds: Vec<OddsQuote>,
}

impl Match {
    pub fn new(home: &str, away: &str, odds: Vec<(Outcome, RawPrice)>) -> Self {
        Self {
            home: home.to_string(),
            away: away.to_string(),
            odds: odds
                .into_iter()
                .map(|(outcome, price)| OddsQuote { outcome, price })
                .collect(),
        }
    }

    /// Parsed price for an outcome, if declared and well-formed.
    pub fn price_of(&self, outcome: Outcome) -> Option<f64> {
        self.odds
            .iter()
            .find(|q| q.outcome == outcome)
            .and_then(|q| q.price.parse())
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.home, self.away)
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// One (match, viable outcome) pair, scored for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub match_id: MatchId,
    pub home: String,
    pub away: String,
    pub outcome: Outcome,
    pub price: f64,
    /// 1 / price
    pub implied_probability: f64,
    /// Model-derived probability, present only when enrichment produced one.
    pub model_probability: Option<f64>,
}

impl Candidate {
    /// Score used for ranking, always in (0, 1].
    pub fn effective_score(&self) -> f64 {
        match self.model_probability {
            Some(p) => p.clamp(f64::MIN_POSITIVE, 1.0),
            None => self.implied_probability,
        }
    }

    /// A copy of this candidate scored by `probability` instead.
    pub fn with_model_probability(&self, probability: f64) -> Self {
        Self {
            model_probability: Some(probability),
            ..self.clone()
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} -> {} @ {:.2} (score={:.3})",
            self.home,
            self.away,
            self.outcome,
            self.price,
            self.effective_score(),
        )
    }
}

// ---------------------------------------------------------------------------
// Selection set
// ---------------------------------------------------------------------------

/// Which selector phase picked a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPass {
    Primary,
    Backfill,
}

/// A selected candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub candidate: Candidate,
    pub pass: SelectionPass,
}

/// Where the final product landed relative to the target interval.
///
/// Informational only: every variant is a valid selector result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    Empty,
    BelowTarget,
    InRange,
    AboveTarget,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Empty => write!(f, "empty"),
            TargetStatus::BelowTarget => write!(f, "below target"),
            TargetStatus::InRange => write!(f, "in range"),
            TargetStatus::AboveTarget => write!(f, "above target"),
        }
    }
}

/// The legs chosen for one run plus their running price product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSet {
    legs: Vec<Leg>,
    product: f64,
}

impl SelectionSet {
    pub(crate) fn new(legs: Vec<Leg>, product: f64) -> Self {
        Self { legs, product }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 1.0)
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Unrounded product of member prices.
    pub fn product(&self) -> f64 {
        self.product
    }

    /// Product rounded to `REPORT_PRECISION` decimals.
    pub fn reported_product(&self) -> f64 {
        round_to(self.product, REPORT_PRECISION)
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.legs.iter().map(|l| &l.candidate)
    }

    pub fn status(&self, target_min: f64, target_max: f64) -> TargetStatus {
        if self.legs.is_empty() {
            TargetStatus::Empty
        } else if self.product < target_min {
            TargetStatus::BelowTarget
        } else if self.product > target_max {
            TargetStatus::AboveTarget
        } else {
            TargetStatus::InRange
        }
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for leg in &self.legs {
            let c = &leg.candidate;
            writeln!(f, "{} vs {} -> {} @ {}", c.home, c.away, c.outcome, c.price)?;
        }
        write!(f, "Total odds: {}", self.reported_product())
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the accumulator job.
#[derive(Debug, thiserror::Error)]
pub enum AccumulatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Match source error ({source_name}): {message}")]
    Source { source_name: String, message: String },

    #[error("Estimator error ({model}): {message}")]
    Estimator { model: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
