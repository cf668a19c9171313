//! Bounds-checked little-endian field readers shared by the chunk parsers.
//!
//! All readers report failures as [`DxbcError::InvalidChunk`] with the field name
//! and offending range in the context string.

use crate::DxbcError;

pub(crate) fn read_u32(bytes: &[u8], offset: usize, what: &str) -> Result<u32, DxbcError> {
    let slice = field(bytes, offset, 4, what)?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize, what: &str) -> Result<u16, DxbcError> {
    let slice = field(bytes, offset, 2, what)?;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

pub(crate) fn read_u8(bytes: &[u8], offset: usize, what: &str) -> Result<u8, DxbcError> {
    Ok(field(bytes, offset, 1, what)?[0])
}

pub(crate) fn read_u32_opt(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let slice = bytes.get(offset..end)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Reads a NUL-terminated UTF-8 string starting at `offset`.
pub(crate) fn read_cstr<'a>(
    bytes: &'a [u8],
    offset: usize,
    what: &str,
) -> Result<&'a str, DxbcError> {
    let tail = bytes.get(offset..).ok_or_else(|| {
        DxbcError::invalid_chunk(format!(
            "{what} offset {offset} is outside chunk length {}",
            bytes.len()
        ))
    })?;
    let nul = tail.iter().position(|&b| b == 0).ok_or_else(|| {
        DxbcError::invalid_chunk(format!("{what} at offset {offset} is missing a null terminator"))
    })?;
    core::str::from_utf8(&tail[..nul]).map_err(|_| {
        DxbcError::invalid_chunk(format!("{what} at offset {offset} is not valid UTF-8"))
    })
}

/// Returns `count * stride` bytes starting at `offset`, checking for overflow.
pub(crate) fn table<'a>(
    bytes: &'a [u8],
    offset: u32,
    count: u32,
    stride: usize,
    what: &str,
) -> Result<&'a [u8], DxbcError> {
    let len = (count as usize)
        .checked_mul(stride)
        .ok_or_else(|| {
            DxbcError::invalid_chunk(format!("{what} count {count} overflows table size"))
        })?;
    field(bytes, offset as usize, len, what)
}

fn field<'a>(
    bytes: &'a [u8],
    offset: usize,
    len: usize,
    what: &str,
) -> Result<&'a [u8], DxbcError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| DxbcError::invalid_chunk(format!("{what} offset overflows")))?;
    bytes.get(offset..end).ok_or_else(|| {
        DxbcError::invalid_chunk(format!(
            "need {len} bytes for {what} at {offset}..{end}, but chunk length is {}",
            bytes.len()
        ))
    })
}
