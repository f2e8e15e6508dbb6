//! Candidate builder.
//!
//! Flattens each match's declared outcomes into independently scorable
//! `Candidate` records. A candidate starts out scored by its implied
//! probability; enrichment may later derive an overridden copy.

use tracing::{debug, info};

use crate::types::{Candidate, Match, MatchId, MIN_VIABLE_PRICE};

/// Build one candidate per (match, viable outcome) pair.
///
/// Match order and declared outcome order are preserved. Malformed prices
/// and prices at or below `MIN_VIABLE_PRICE` drop that outcome only.
pub fn build_candidates(matches: &[Match]) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(matches.len() * 3);
    let mut skipped = 0usize;

    for (idx, fixture) in matches.iter().enumerate() {
        for quote in &fixture.odds {
            let Some(price) = quote.price.parse() else {
                debug!(
                    match_id = idx,
                    outcome = %quote.outcome,
                    raw = ?quote.price,
                    "Malformed price, outcome skipped"
                );
                skipped += 1;
                continue;
            };
            if price <= MIN_VIABLE_PRICE {
                skipped += 1;
                continue;
            }
            candidates.push(Candidate {
                match_id: MatchId(idx),
                home: fixture.home.clone(),
                away: fixture.away.clone(),
                outcome: quote.outcome,
                price,
                implied_probability: 1.0 / price,
                model_probability: None,
            });
        }
    }

    info!(
        matches = matches.len(),
        candidates = candidates.len(),
        skipped,
        "Candidates built"
    );

    candidates
}
