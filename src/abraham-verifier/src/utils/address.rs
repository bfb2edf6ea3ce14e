//! Address parsing for policy inputs.
//!
//! Hex addresses arrive in any letter case (checksummed, lower, upper); parsing them into
//! [`Address`] bytes is the normalisation, so comparisons are case-insensitive.

use alloy_primitives::{hex, Address};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must be 20 bytes, got {0} hex characters")]
    InvalidLength(usize),
    #[error("address is not valid hex")]
    InvalidHex,
}

/// Parse a hex address with or without `0x`, ignoring letter case (no checksum check).
pub fn parse_address(s: &str) -> Result<Address, AddressError> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if digits.len() != 40 {
        return Err(AddressError::InvalidLength(digits.len()));
    }
    let bytes: [u8; 20] = hex::decode_to_array(digits).map_err(|_| AddressError::InvalidHex)?;
    Ok(Address::from(bytes))
}
