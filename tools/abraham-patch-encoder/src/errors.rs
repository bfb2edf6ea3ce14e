/// Errors while building a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The input holds an unpaired UTF-16 surrogate at `index`.
    #[error("invalid character encoding: unpaired surrogate {code_unit:#06x} at index {index}")]
    InvalidCharacterEncoding { index: usize, code_unit: u16 },
    /// An inserted character does not fit the one-byte payload of `Insert`.
    #[error("character {code_unit:#06x} at index {index} does not fit a Latin-1 insert payload")]
    UnencodableCharacter { index: usize, code_unit: u16 },
    /// Input exceeds the configured size bound.
    #[error("input too large: {len} characters exceeds max {max}")]
    InputTooLarge { len: usize, max: usize },
}
