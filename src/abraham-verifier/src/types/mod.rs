//! Shared types for patch ops, policies and quota tracking.

pub use abraham_types::patch::{self, Opcode, PatchOp, HEADER_LEN, MAX_RUN_LEN};
pub use abraham_types::policy::{
    self, parse_selector, selector, AllowRule, CandidateCall, Selector, SelectorRule, TierAPolicy,
};
pub use abraham_types::quota::{QuotaError, QuotaReceipt, QuotaStore};
