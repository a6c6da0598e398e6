/*!
 * Daily spend tracking for translation routing.
 *
 * The guard owns the cumulative spend for the current accounting window and
 * enforces the ceiling atomically: a charge either commits in full or is
 * rejected with the remaining allowance, never partially applied.
 */

use log::debug;
use parking_lot::Mutex;

use crate::errors::RouteError;

/// Snapshot of the guard's state for reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetState {
    /// Cumulative spend in the current window, USD
    pub spent_usd: f64,
    /// Configured ceiling, USD
    pub ceiling_usd: f64,
}

impl BudgetState {
    pub fn remaining_usd(&self) -> f64 {
        (self.ceiling_usd - self.spent_usd).max(0.0)
    }
}

/// Tracks cumulative spend against a daily ceiling.
///
/// Shared across concurrent requests; the check-then-commit path holds the
/// lock for the whole read-modify-write so concurrent charges cannot
/// over-spend.
pub struct BudgetGuard {
    ceiling_usd: f64,
    spent_usd: Mutex<f64>,
}

impl BudgetGuard {
    /// Create a guard with the given daily ceiling in USD
    pub fn new(ceiling_usd: f64) -> Self {
        Self {
            ceiling_usd,
            spent_usd: Mutex::new(0.0),
        }
    }

    /// Charge an amount against the window.
    ///
    /// Returns the new cumulative total on success. If the charge would push
    /// spend past the ceiling it is rejected whole and the state is left
    /// unchanged.
    pub fn charge(&self, amount_usd: f64) -> Result<f64, RouteError> {
        let mut spent = self.spent_usd.lock();
        let new_total = *spent + amount_usd;

        if new_total > self.ceiling_usd {
            let remaining = (self.ceiling_usd - *spent).max(0.0);
            debug!(
                "Budget charge of {:.4} USD rejected ({:.4} remaining of {:.4})",
                amount_usd, remaining, self.ceiling_usd
            );
            return Err(RouteError::BudgetExceeded {
                remaining_usd: remaining,
            });
        }

        *spent = new_total;
        Ok(new_total)
    }

    /// Zero the window's spend (window rollover, test harness use)
    pub fn reset(&self) {
        *self.spent_usd.lock() = 0.0;
    }

    /// Allowance left in the current window
    pub fn remaining_usd(&self) -> f64 {
        (self.ceiling_usd - *self.spent_usd.lock()).max(0.0)
    }

    /// Current state snapshot
    pub fn state(&self) -> BudgetState {
        BudgetState {
            spent_usd: *self.spent_usd.lock(),
            ceiling_usd: self.ceiling_usd,
        }
    }
}
