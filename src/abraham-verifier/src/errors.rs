use alloy_primitives::{Address, U256};

use crate::types::Selector;

/// Errors during patch decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("patch stream truncated")]
    Truncated,
    /// Op header at `offset` declares zero characters.
    #[error("zero-length op at byte {offset}")]
    ZeroLengthRun { offset: usize },
    #[error("too many ops")]
    TooManyOps,
    #[error("patch is not valid hex")]
    InvalidHex,
}

/// Errors while replaying ops against the old text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// An `Equal`/`Delete` op reaches past the end of the old text.
    #[error("op at offset {offset} needs {needed} characters, only {available} left")]
    SourceOverrun { offset: usize, needed: usize, available: usize },
    /// The stream ended before consuming the whole old text.
    #[error("{remaining} characters of the old text not covered by the patch")]
    TrailingSource { remaining: usize },
    #[error("patched text is not valid UTF-16")]
    InvalidCharacterEncoding,
}

/// Why the Tier-A policy refused a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("no allow rule for target {to}")]
    NoMatchingRule { to: Address },
    #[error("selector {selector} not allowed on {to}")]
    SelectorNotAllowed { to: Address, selector: Selector },
    #[error("value {value} exceeds per-call max {max}")]
    ValueExceedsMax { value: U256, max: U256 },
}

/// Errors from daily spend tracking.
pub use abraham_types::QuotaError;
