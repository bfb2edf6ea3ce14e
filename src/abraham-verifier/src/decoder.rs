use alloy_primitives::hex;

use crate::{
    errors::{ApplyError, DecodeError},
    types::patch::{Opcode, PatchOp, HEADER_LEN},
    utils::bytes::{read_u16_be, read_u16_vec_be, read_u8, read_vec},
};

const MAX_OPS_DEFAULT: usize = 1 << 20;

/// Decode a patch stream into ops.
pub fn decode_patch(bytes: &[u8]) -> Result<Vec<PatchOp>, DecodeError> {
    decode_patch_with_limit(bytes, MAX_OPS_DEFAULT)
}

pub fn decode_patch_with_limit(bytes: &[u8], max_ops: usize) -> Result<Vec<PatchOp>, DecodeError> {
    let mut ops = Vec::with_capacity((bytes.len() / HEADER_LEN).min(max_ops));
    let mut i = 0usize;

    while i < bytes.len() {
        if ops.len() >= max_ops {
            return Err(DecodeError::TooManyOps);
        }
        let offset = i;
        let raw = read_u8(bytes, &mut i)?;
        let opcode = Opcode::try_from(raw).map_err(|_| DecodeError::UnknownOpcode(raw))?;
        let len = read_u16_be(bytes, &mut i)?;
        if len == 0 {
            return Err(DecodeError::ZeroLengthRun { offset });
        }

        let op = match opcode {
            Opcode::Equal => PatchOp::Equal { len },
            Opcode::Delete => PatchOp::Delete { len },
            Opcode::Insert => PatchOp::Insert { bytes: read_vec(bytes, &mut i, len as usize)? },
            Opcode::InsertWide => PatchOp::InsertWide { units: read_u16_vec_be(bytes, &mut i, len as usize)? },
        };
        ops.push(op);
    }

    Ok(ops)
}

/// Decode the `0x`-prefixed hex rendering used in call data.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, DecodeError> {
    hex::decode(s.trim()).map_err(|_| DecodeError::InvalidHex)
}

/// Replay `ops` against `old_text`, producing the new text.
pub fn apply_patch(old_text: &str, ops: &[PatchOp]) -> Result<String, ApplyError> {
    let old: Vec<u16> = old_text.encode_utf16().collect();
    let units = apply_patch_utf16(&old, ops)?;
    String::from_utf16(&units).map_err(|_| ApplyError::InvalidCharacterEncoding)
}

/// Replay `ops` over UTF-16 code units. The ops must cover the old text exactly.
pub fn apply_patch_utf16(old: &[u16], ops: &[PatchOp]) -> Result<Vec<u16>, ApplyError> {
    let mut out = Vec::with_capacity(old.len());
    let mut pos = 0usize;

    for op in ops {
        match op {
            PatchOp::Equal { len } => {
                let end = advance(old, pos, *len as usize)?;
                out.extend_from_slice(&old[pos..end]);
                pos = end;
            }
            PatchOp::Delete { len } => {
                pos = advance(old, pos, *len as usize)?;
            }
            // Latin-1: byte value is the code point.
            PatchOp::Insert { bytes } => out.extend(bytes.iter().map(|&b| u16::from(b))),
            PatchOp::InsertWide { units } => out.extend_from_slice(units),
        }
    }

    if pos != old.len() {
        return Err(ApplyError::TrailingSource { remaining: old.len() - pos });
    }
    Ok(out)
}

/// Deleted plus inserted characters of a decoded stream.
pub fn changed_count(ops: &[PatchOp]) -> u64 {
    ops.iter().filter(|op| op.is_change()).map(|op| op.len() as u64).sum()
}

fn advance(old: &[u16], pos: usize, len: usize) -> Result<usize, ApplyError> {
    let available = old.len() - pos;
    if len > available {
        return Err(ApplyError::SourceOverrun { offset: pos, needed: len, available });
    }
    Ok(pos + len)
}
