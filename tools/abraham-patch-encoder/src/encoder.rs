use abraham_types::{Opcode, PatchOp, MAX_RUN_LEN};
use tracing::debug;

use crate::diff::{self, Diff, DiffKind};
use crate::errors::EncodeError;
use crate::types::{Patch, PatchConfig, PayloadEncoding};

/// Build the patch turning `old_text` into `new_text` with default settings.
pub fn build_patch(old_text: &str, new_text: &str) -> Result<Patch, EncodeError> {
    build_patch_with(&PatchConfig::default(), old_text, new_text)
}

pub fn build_patch_with(
    config: &PatchConfig,
    old_text: &str,
    new_text: &str,
) -> Result<Patch, EncodeError> {
    let old: Vec<u16> = old_text.encode_utf16().collect();
    let new: Vec<u16> = new_text.encode_utf16().collect();
    build_patch_utf16(config, &old, &new)
}

/// Build a patch from raw UTF-16 code units.
///
/// Unpaired surrogates in either input are rejected rather than diffed.
pub fn build_patch_utf16(
    config: &PatchConfig,
    old: &[u16],
    new: &[u16],
) -> Result<Patch, EncodeError> {
    if let Some(max) = config.max_chars {
        let len = old.len().max(new.len());
        if len > max {
            return Err(EncodeError::InputTooLarge { len, max });
        }
    }
    validate_utf16(old)?;
    validate_utf16(new)?;

    let diffs = diff_texts(config, old, new);
    let changed_count = diffs
        .iter()
        .filter(|d| d.kind != DiffKind::Equal)
        .map(|d| d.len() as u64)
        .sum();
    let ops = diffs_to_ops(&diffs, config.payload)?;
    let encoded = encode_ops(&ops);

    debug!(
        old_len = old.len(),
        new_len = new.len(),
        ops = ops.len(),
        bytes = encoded.len(),
        changed_count,
        "built prompt patch"
    );

    Ok(Patch { encoded: encoded.into(), changed_count })
}

/// Diff plus the configured cleanup passes.
pub fn diff_texts(config: &PatchConfig, old: &[u16], new: &[u16]) -> Vec<Diff> {
    let mut diffs = diff::diff(old, new);
    if config.edit_cost > 0 {
        // Absorbed equalities become inserts, so in Latin-1 mode they must stay encodable.
        let payload = config.payload;
        diff::cleanup_efficiency(&mut diffs, config.edit_cost, |eq| {
            payload == PayloadEncoding::Wide || eq.iter().all(|&u| u <= 0xFF)
        });
    }
    diffs
}

/// Turn diff runs into wire ops, splitting anything longer than [`MAX_RUN_LEN`].
pub fn diffs_to_ops(diffs: &[Diff], payload: PayloadEncoding) -> Result<Vec<PatchOp>, EncodeError> {
    let mut ops = Vec::with_capacity(diffs.len());
    // Position in the new text, for error reporting.
    let mut new_pos = 0usize;

    for diff in diffs {
        match diff.kind {
            DiffKind::Equal => {
                push_split(&mut ops, diff.len(), |len| PatchOp::Equal { len });
                new_pos += diff.len();
            }
            DiffKind::Delete => {
                push_split(&mut ops, diff.len(), |len| PatchOp::Delete { len });
            }
            DiffKind::Insert => {
                for chunk in diff.text.chunks(MAX_RUN_LEN) {
                    ops.push(insert_op(chunk, new_pos, payload)?);
                    new_pos += chunk.len();
                }
            }
        }
    }
    Ok(ops)
}

fn push_split(ops: &mut Vec<PatchOp>, mut len: usize, make: impl Fn(u16) -> PatchOp) {
    while len > 0 {
        let n = len.min(MAX_RUN_LEN);
        ops.push(make(n as u16));
        len -= n;
    }
}

fn insert_op(units: &[u16], base: usize, payload: PayloadEncoding) -> Result<PatchOp, EncodeError> {
    match units.iter().position(|&u| u > 0xFF) {
        None => Ok(PatchOp::Insert { bytes: units.iter().map(|&u| u as u8).collect() }),
        Some(_) if payload == PayloadEncoding::Wide => Ok(PatchOp::InsertWide { units: units.to_vec() }),
        Some(offset) => Err(EncodeError::UnencodableCharacter {
            index: base + offset,
            code_unit: units[offset],
        }),
    }
}

/// Serialise ops into the patch byte stream.
pub fn encode_ops(ops: &[PatchOp]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ops.iter().map(PatchOp::encoded_len).sum());
    for op in ops {
        match op {
            PatchOp::Equal { len } => {
                buf.push(Opcode::Equal as u8);
                buf.extend_from_slice(&len.to_be_bytes());
            }
            PatchOp::Delete { len } => {
                buf.push(Opcode::Delete as u8);
                buf.extend_from_slice(&len.to_be_bytes());
            }
            PatchOp::Insert { bytes } => {
                buf.push(Opcode::Insert as u8);
                buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                buf.extend_from_slice(bytes);
            }
            PatchOp::InsertWide { units } => {
                buf.push(Opcode::InsertWide as u8);
                buf.extend_from_slice(&(units.len() as u16).to_be_bytes());
                for unit in units {
                    buf.extend_from_slice(&unit.to_be_bytes());
                }
            }
        }
    }
    buf
}

fn validate_utf16(units: &[u16]) -> Result<(), EncodeError> {
    let mut i = 0usize;
    while i < units.len() {
        let unit = units[i];
        match unit {
            0xD800..=0xDBFF => match units.get(i + 1) {
                Some(0xDC00..=0xDFFF) => i += 1,
                _ => return Err(EncodeError::InvalidCharacterEncoding { index: i, code_unit: unit }),
            },
            0xDC00..=0xDFFF => {
                return Err(EncodeError::InvalidCharacterEncoding { index: i, code_unit: unit })
            }
            _ => {}
        }
        i += 1;
    }
    Ok(())
}
