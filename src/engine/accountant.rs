//! Accountant: weekly performance summary over the run log.
//!
//! Uses a simple rollover model: a win rolls the stake into
//! `stake × total_odds`, a loss resets the balance to the starting
//! bankroll, and unsettled entries leave it unchanged.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

use crate::storage::LogEntry;

/// Days covered by the summary window.
const WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub pending: usize,
    pub start_balance: Decimal,
    pub balance: Decimal,
    /// Percent return on the starting bankroll.
    pub roi_pct: Decimal,
}

impl WeeklySummary {
    /// Summarise entries dated within the last seven days of `now`.
    pub fn from_logs(logs: &[LogEntry], now: DateTime<Utc>, start_balance: Decimal) -> Self {
        let cutoff = (now - Duration::days(WINDOW_DAYS)).date_naive();
        let week: Vec<&LogEntry> = logs
            .iter()
            .filter(|l| l.timestamp.date_naive() >= cutoff)
            .collect();

        let mut balance = start_balance;
        let (mut wins, mut losses, mut pending) = (0, 0, 0);
        for entry in &week {
            match entry.won {
                Some(true) => {
                    wins += 1;
                    balance = entry.stake * entry.total_odds;
                }
                Some(false) => {
                    losses += 1;
                    balance = start_balance;
                }
                None => pending += 1,
            }
        }

        let roi_pct = if start_balance.is_zero() {
            Decimal::ZERO
        } else {
            ((balance - start_balance) / start_balance * dec!(100)).round_dp(2)
        };

        WeeklySummary {
            total: week.len(),
            wins,
            losses,
            pending,
            start_balance,
            balance,
            roi_pct,
        }
    }
}

impl fmt::Display for WeeklySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Weekly Performance (last {WINDOW_DAYS} days):")?;
        writeln!(f, "Total picks logged: {}", self.total)?;
        writeln!(f, "Wins: {}", self.wins)?;
        writeln!(f, "Losses: {}", self.losses)?;
        writeln!(f, "Current Balance (rollover): {:.2}", self.balance)?;
        write!(f, "ROI: {:.2}%", self.roi_pct)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
