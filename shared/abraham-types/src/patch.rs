use alloc::vec::Vec;

/// Largest character count a single op can carry (the length field is a `u16`).
pub const MAX_RUN_LEN: usize = u16::MAX as usize;

/// Size of every op header: opcode byte + big-endian `u16` length.
pub const HEADER_LEN: usize = 3;

/// Opcodes of the prompt patch stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Equal = 0x00,
    Delete = 0x01,
    Insert = 0x02,
    /// Insert whose payload carries two bytes (big-endian) per UTF-16 code unit.
    InsertWide = 0x03,
}

/// Decoded representation of a single patch op.
///
/// Lengths count UTF-16 code units of the edited text, never bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOp {
    /// Copy `len` characters from the old text.
    Equal { len: u16 },
    /// Skip `len` characters of the old text.
    Delete { len: u16 },
    /// Emit the given Latin-1 characters, one byte each.
    Insert { bytes: Vec<u8> },
    /// Emit the given UTF-16 code units.
    InsertWide { units: Vec<u16> },
}

impl PatchOp {
    pub fn opcode(&self) -> Opcode {
        match self {
            PatchOp::Equal { .. } => Opcode::Equal,
            PatchOp::Delete { .. } => Opcode::Delete,
            PatchOp::Insert { .. } => Opcode::Insert,
            PatchOp::InsertWide { .. } => Opcode::InsertWide,
        }
    }

    /// Number of characters this op covers.
    pub fn len(&self) -> usize {
        match self {
            PatchOp::Equal { len } | PatchOp::Delete { len } => *len as usize,
            PatchOp::Insert { bytes } => bytes.len(),
            PatchOp::InsertWide { units } => units.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the op counts towards the priced "changed" characters.
    pub fn is_change(&self) -> bool {
        !matches!(self, PatchOp::Equal { .. })
    }

    /// Bytes this op occupies in the encoded stream.
    pub fn encoded_len(&self) -> usize {
        match self {
            PatchOp::Equal { .. } | PatchOp::Delete { .. } => HEADER_LEN,
            PatchOp::Insert { bytes } => HEADER_LEN + bytes.len(),
            PatchOp::InsertWide { units } => HEADER_LEN + 2 * units.len(),
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        let op = match value {
            0x00 => Equal,
            0x01 => Delete,
            0x02 => Insert,
            0x03 => InsertWide,
            _ => return Err(()),
        };
        Ok(op)
    }
}
