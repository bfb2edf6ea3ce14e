use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use alloy_primitives::{Address, U256};
use time::{Date, OffsetDateTime};
use tracing::{debug, warn};

use crate::types::{QuotaError, QuotaReceipt, QuotaStore};

#[derive(Clone, Copy, Debug)]
struct DayLedger {
    day: Date,
    spent: U256,
}

#[derive(Debug, Default)]
struct Ledgers {
    /// Latest day seen by `try_spend`; older ledgers are dropped when it moves on.
    latest: Option<Date>,
    by_user: HashMap<Address, DayLedger>,
}

/// One user's spend on one day, for persisting a [`MemoryQuotaStore`] between runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user: Address,
    pub day: Date,
    pub spent: U256,
}

/// In-process [`QuotaStore`] keyed by user, resetting at UTC midnight.
///
/// Ledgers from earlier days are dropped the first time a spend lands on a new day, so
/// the map only holds users active on the current day. State lives in memory; use
/// [`MemoryQuotaStore::entries`] and [`MemoryQuotaStore::from_entries`] to carry it
/// across restarts.
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    ledgers: Mutex<Ledgers>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from saved entries. Later entries for the same user win.
    pub fn from_entries<I: IntoIterator<Item = LedgerEntry>>(entries: I) -> Self {
        let mut ledgers = Ledgers::default();
        for entry in entries {
            ledgers.latest = ledgers.latest.max(Some(entry.day));
            ledgers
                .by_user
                .insert(entry.user, DayLedger { day: entry.day, spent: entry.spent });
        }
        Self { ledgers: Mutex::new(ledgers) }
    }

    /// Snapshot of every ledger currently held, in no particular order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.lock()
            .by_user
            .iter()
            .map(|(user, ledger)| LedgerEntry { user: *user, day: ledger.day, spent: ledger.spent })
            .collect()
    }

    /// Drop ledgers from days other than the day of `now_unix`.
    pub fn prune(&self, now_unix: i64) -> Result<usize, QuotaError> {
        let today = utc_day(now_unix)?;
        let mut ledgers = self.lock();
        let before = ledgers.by_user.len();
        ledgers.by_user.retain(|_, ledger| ledger.day == today);
        Ok(before - ledgers.by_user.len())
    }

    fn lock(&self) -> MutexGuard<'_, Ledgers> {
        // Updates are single inserts, so a poisoned map is still consistent.
        self.ledgers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn try_spend(
        &self,
        user: Address,
        amount: U256,
        cap: U256,
        now_unix: i64,
    ) -> Result<QuotaReceipt, QuotaError> {
        let day = utc_day(now_unix)?;
        let mut ledgers = self.lock();
        if ledgers.latest < Some(day) {
            let before = ledgers.by_user.len();
            ledgers.by_user.retain(|_, ledger| ledger.day >= day);
            ledgers.latest = Some(day);
            debug!(%day, dropped = before - ledgers.by_user.len(), "quota day rolled over");
        }
        let spent = spent_on(&ledgers.by_user, &user, day);

        let total = match spent.checked_add(amount) {
            Some(total) if total <= cap => total,
            _ => {
                warn!(%user, %spent, %amount, %cap, "daily cap exceeded");
                return Err(QuotaError::DailyCapExceeded { spent, requested: amount, cap });
            }
        };
        ledgers.by_user.insert(user, DayLedger { day, spent: total });
        debug!(%user, spent = %total, %cap, "recorded sponsored spend");

        Ok(QuotaReceipt { spent_today: total, remaining: cap - total })
    }

    fn spent_today(&self, user: Address, now_unix: i64) -> Result<U256, QuotaError> {
        let day = utc_day(now_unix)?;
        Ok(spent_on(&self.lock().by_user, &user, day))
    }
}

fn spent_on(ledgers: &HashMap<Address, DayLedger>, user: &Address, day: Date) -> U256 {
    ledgers
        .get(user)
        .filter(|ledger| ledger.day == day)
        .map_or(U256::ZERO, |ledger| ledger.spent)
}

fn utc_day(now_unix: i64) -> Result<Date, QuotaError> {
    OffsetDateTime::from_unix_timestamp(now_unix)
        .map(OffsetDateTime::date)
        .map_err(|_| QuotaError::InvalidTimestamp(now_unix))
}
