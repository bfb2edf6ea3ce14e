//! Minimal big-endian parsing helpers for the patch stream.

use crate::errors::DecodeError;

pub fn read_u8(bytes: &[u8], i: &mut usize) -> Result<u8, DecodeError> {
    let b = *bytes.get(*i).ok_or(DecodeError::Truncated)?;
    *i += 1;
    Ok(b)
}

pub fn read_u16_be(bytes: &[u8], i: &mut usize) -> Result<u16, DecodeError> {
    if bytes.len() < *i + 2 {
        return Err(DecodeError::Truncated);
    }
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[*i..*i + 2]);
    *i += 2;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_vec(bytes: &[u8], i: &mut usize, len: usize) -> Result<Vec<u8>, DecodeError> {
    if bytes.len() < *i + len {
        return Err(DecodeError::Truncated);
    }
    let out = bytes[*i..*i + len].to_vec();
    *i += len;
    Ok(out)
}

/// Read `count` big-endian `u16`s.
pub fn read_u16_vec_be(bytes: &[u8], i: &mut usize, count: usize) -> Result<Vec<u16>, DecodeError> {
    let raw_len = count * 2;
    if bytes.len() < *i + raw_len {
        return Err(DecodeError::Truncated);
    }
    let out = bytes[*i..*i + raw_len]
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    *i += raw_len;
    Ok(out)
}
