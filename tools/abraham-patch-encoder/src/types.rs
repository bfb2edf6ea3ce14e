use alloy_primitives::{hex, Bytes};

/// Default edit cost for the efficiency cleanup pass.
pub const DEFAULT_EDIT_COST: usize = 4;

/// How inserted characters are written into the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// One byte per character (`Insert`). Characters above 0xFF are rejected.
    #[default]
    Latin1,
    /// Like `Latin1`, but runs containing characters above 0xFF are written as
    /// `InsertWide` with two bytes per character.
    Wide,
}

/// Encoder settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchConfig {
    pub payload: PayloadEncoding,
    /// Edit cost of the efficiency cleanup; `0` disables the pass.
    pub edit_cost: usize,
    /// Upper bound on either input, in UTF-16 code units.
    pub max_chars: Option<usize>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self { payload: PayloadEncoding::Latin1, edit_cost: DEFAULT_EDIT_COST, max_chars: None }
    }
}

/// Encoded patch ready for submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    /// Opcode stream.
    pub encoded: Bytes,
    /// Characters deleted plus characters inserted; drives the per-character fee.
    pub changed_count: u64,
}

impl Patch {
    /// `0x`-prefixed lowercase hex of the stream, as passed in call data.
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.encoded)
    }
}
