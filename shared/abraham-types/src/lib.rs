//! Shared types for Abraham prompt patches and Tier-A transaction policy.
//!
//! Used by both the producer side (patch encoder, tooling) and the consumer side
//! (patch verifier, sponsored-transaction gate), so the wire format and policy shape
//! cannot drift between them.

#![no_std]

extern crate alloc;

pub mod patch;
pub mod policy;
pub mod quota;

pub use patch::{Opcode, PatchOp, MAX_RUN_LEN};
pub use policy::{
    parse_selector, selector, AllowRule, CandidateCall, Selector, SelectorError, SelectorRule,
    TierAPolicy,
};
pub use quota::{QuotaError, QuotaReceipt, QuotaStore};
