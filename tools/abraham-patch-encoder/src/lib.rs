//! Patch encoder for pay-per-byte prompt edits.
//!
//! Diffs an old and a new prompt at the UTF-16 code unit level and serialises the result
//! into the opcode stream stored on-chain, along with the changed-character count the
//! edit fee is priced on.

pub mod diff;
pub mod encoder;
pub mod errors;
pub mod types;

#[cfg(test)]
mod tests;

pub use abraham_types::{Opcode, PatchOp, MAX_RUN_LEN};
pub use encoder::{build_patch, build_patch_utf16, build_patch_with, encode_ops};
pub use errors::EncodeError;
pub use types::{Patch, PatchConfig, PayloadEncoding};
