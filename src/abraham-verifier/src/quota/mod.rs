//! Daily spend tracking for sponsored calls.

pub mod memory;

pub use crate::types::{QuotaError, QuotaReceipt, QuotaStore};
pub use memory::{LedgerEntry, MemoryQuotaStore};
