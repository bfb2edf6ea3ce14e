//! Consumer side of Abraham prompt edits and sponsored transactions.
//!
//! - [`decoder`] parses the patch opcode stream and replays it against the stored prompt.
//! - [`evaluator`] is the pure Tier-A allow-list check.
//! - [`gate`] composes the allow-list with a [`QuotaStore`] for daily value caps.

pub mod decoder;
pub mod errors;
pub mod evaluator;
pub mod gate;
pub mod quota;
pub mod types;
pub mod utils;

pub use decoder::{apply_patch, apply_patch_utf16, changed_count, decode_hex, decode_patch};
pub use errors::{ApplyError, DecodeError, PolicyViolation, QuotaError};
pub use evaluator::{check_call, is_allowed};
pub use gate::{Authorization, Rejection, TierAGate};
pub use quota::{LedgerEntry, MemoryQuotaStore};
pub use types::{AllowRule, CandidateCall, QuotaReceipt, QuotaStore, Selector, SelectorRule, TierAPolicy};
