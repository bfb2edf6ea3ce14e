use alloy_primitives::{Address, U256};

/// Errors from daily spend tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    /// Spending `requested` on top of `spent` would pass `cap` for the current day.
    #[error("daily cap exceeded: spent {spent} + requested {requested} > cap {cap}")]
    DailyCapExceeded { spent: U256, requested: U256, cap: U256 },
    /// The timestamp could not be mapped to a calendar day.
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(i64),
}

/// Outcome of an accepted spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaReceipt {
    /// Total spent today, including this spend.
    pub spent_today: U256,
    /// What is left before the cap.
    pub remaining: U256,
}

/// Per-user daily value tracking for sponsored calls.
///
/// Implementations own persistent state; the allow-list evaluation stays pure and never
/// consults this. Days are UTC calendar days of `now_unix`.
pub trait QuotaStore {
    /// Atomically record `amount` against `user` if it fits under `cap` for today.
    /// A rejected spend leaves the store unchanged.
    fn try_spend(
        &self,
        user: Address,
        amount: U256,
        cap: U256,
        now_unix: i64,
    ) -> Result<QuotaReceipt, QuotaError>;

    /// Amount spent by `user` on the day of `now_unix`.
    fn spent_today(&self, user: Address, now_unix: i64) -> Result<U256, QuotaError>;
}
