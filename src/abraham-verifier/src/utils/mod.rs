//! Shared utilities for the verifier.

pub mod address;
pub mod bytes;
