//! Accumulator selector.
//!
//! Two-phase greedy assembly of a selection set whose combined price lands
//! inside a target interval:
//!
//! 1. Primary pass: candidates ranked by effective score (highest first),
//!    one per match, until the leg minimum is met with the product in range
//!    or the leg maximum is reached.
//! 2. Backfill pass: only when the product is still under target and leg
//!    budget remains. Unused candidates are re-ranked by raw price so the
//!    remaining legs close the gap as quickly as possible.
//!
//! Both sorts are stable, so ties keep candidate order and a given input
//! always yields the same set. Out-of-range results are returned as-is.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{
    AccumulatorError, Candidate, Leg, MatchId, SelectionPass, SelectionSet, TargetStatus,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Lower bound of the acceptable product (inclusive).
    pub target_min: f64,
    /// Upper bound of the acceptable product (inclusive).
    pub target_max: f64,
    pub legs_min: usize,
    /// Hard cap on set size.
    pub legs_max: usize,
    /// When set, the primary pass skips candidates priced below this.
    /// The backfill pass ignores it.
    ///
    /// Backfill only runs while the product is under `target_min`, so with
    /// a floor the set can finish in range (or above it) with fewer than
    /// `legs_min` legs even though lower-priced matches were left unused.
    #[serde(default)]
    pub min_leg_price: Option<f64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            target_min: 3.0,
            target_max: 4.0,
            legs_min: 3,
            legs_max: 4,
            min_leg_price: None,
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<(), AccumulatorError> {
        if !(self.target_min.is_finite() && self.target_max.is_finite()) {
            return Err(AccumulatorError::Config("target bounds must be finite".into()));
        }
        if self.target_min <= 1.0 {
            return Err(AccumulatorError::Config(format!(
                "target_min must be > 1.0, got {}",
                self.target_min
            )));
        }
        if self.target_min >= self.target_max {
            return Err(AccumulatorError::Config(format!(
                "target_min ({}) must be below target_max ({})",
                self.target_min, self.target_max
            )));
        }
        if self.legs_min == 0 {
            return Err(AccumulatorError::Config("legs_min must be at least 1".into()));
        }
        if self.legs_min > self.legs_max {
            return Err(AccumulatorError::Config(format!(
                "legs_min ({}) must not exceed legs_max ({})",
                self.legs_min, self.legs_max
            )));
        }
        if let Some(floor) = self.min_leg_price {
            if !floor.is_finite() || floor <= 1.0 {
                return Err(AccumulatorError::Config(format!(
                    "min_leg_price must be > 1.0, got {floor}"
                )));
            }
        }
        Ok(())
    }

    fn in_target(&self, product: f64) -> bool {
        (self.target_min..=self.target_max).contains(&product)
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Selector {
    config: SelectorConfig,
}

/// Running state shared by both passes.
struct Assembly {
    legs: Vec<Leg>,
    used: HashSet<MatchId>,
    product: f64,
}

impl Assembly {
    fn new() -> Self {
        Self {
            legs: Vec::new(),
            used: HashSet::new(),
            product: 1.0,
        }
    }

    fn push(&mut self, candidate: &Candidate, pass: SelectionPass) {
        self.used.insert(candidate.match_id);
        self.product *= candidate.price;
        debug!(
            match_id = %candidate.match_id,
            outcome = %candidate.outcome,
            price = candidate.price,
            score = candidate.effective_score(),
            product = self.product,
            pass = ?pass,
            "Leg added"
        );
        self.legs.push(Leg {
            candidate: candidate.clone(),
            pass,
        });
    }
}

impl Selector {
    pub fn new(config: SelectorConfig) -> Result<Self, AccumulatorError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Assemble a selection set from a candidate snapshot.
    pub fn select(&self, candidates: &[Candidate]) -> SelectionSet {
        if candidates.is_empty() {
            info!("No candidates, returning empty selection");
            return SelectionSet::empty();
        }

        let mut acc = Assembly::new();
        self.primary_pass(candidates, &mut acc);

        if acc.product < self.config.target_min && acc.legs.len() < self.config.legs_max {
            self.backfill_pass(candidates, &mut acc);
        }

        let set = SelectionSet::new(acc.legs, acc.product);
        info!(
            legs = set.len(),
            product = set.reported_product(),
            status = %set.status(self.config.target_min, self.config.target_max),
            "Selection complete"
        );
        set
    }

    /// Classify a set against this selector's target interval.
    pub fn status(&self, set: &SelectionSet) -> TargetStatus {
        set.status(self.config.target_min, self.config.target_max)
    }

    fn primary_pass(&self, candidates: &[Candidate], acc: &mut Assembly) {
        let mut ranked: Vec<&Candidate> = candidates.iter().collect();
        ranked.sort_by(|a, b| descending(a.effective_score(), b.effective_score()));

        for c in ranked {
            if acc.used.contains(&c.match_id) {
                continue;
            }
            if let Some(floor) = self.config.min_leg_price {
                if c.price < floor {
                    continue;
                }
            }
            acc.push(c, SelectionPass::Primary);
            if acc.legs.len() >= self.config.legs_min && self.config.in_target(acc.product) {
                break;
            }
            if acc.legs.len() >= self.config.legs_max {
                break;
            }
        }
    }

    fn backfill_pass(&self, candidates: &[Candidate], acc: &mut Assembly) {
        let mut ranked: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| !acc.used.contains(&c.match_id))
            .collect();
        ranked.sort_by(|a, b| descending(a.price, b.price));

        debug!(
            remaining = ranked.len(),
            product = acc.product,
            "Entering backfill pass"
        );

        for c in ranked {
            if acc.used.contains(&c.match_id) {
                continue;
            }
            acc.push(c, SelectionPass::Backfill);
            if acc.legs.len() >= self.config.legs_max || acc.product >= self.config.target_min {
                break;
            }
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
