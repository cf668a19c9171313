//! Parsers for the input/output signature chunks (`ISGN`, `OSGN`, `OSG5`, `ISG1`, `OSG1`).
//!
//! Each spelling uses a different entry layout. The fourcc alone decides which one is
//! read; no layout sniffing is attempted.

use crate::fourcc::FourCC;
use crate::reader::{read_cstr, read_u32, read_u8, table};
use crate::DxbcError;

const SIGNATURE_HEADER_LEN: usize = 8;

/// Register component type (`D3D_REGISTER_COMPONENT_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 32-bit unsigned integer.
    Uint32,
    /// 32-bit signed integer.
    Sint32,
    /// 32-bit float.
    Float32,
    /// Anything else, including `D3D_REGISTER_COMPONENT_UNKNOWN` (0).
    Unknown(u32),
}

impl ComponentType {
    /// Decodes the raw `D3D_REGISTER_COMPONENT_TYPE` value.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Uint32,
            2 => Self::Sint32,
            3 => Self::Float32,
            other => Self::Unknown(other),
        }
    }
}

/// A parsed signature chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureChunk {
    /// Parsed entries in declaration order.
    pub entries: Vec<SignatureEntry>,
}

/// A single signature parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    /// The semantic name (e.g. `"POSITION"` or `"TEXCOORD"`).
    pub semantic_name: String,
    /// The semantic index (e.g. `0` for `TEXCOORD0`).
    pub semantic_index: u32,
    /// Register index assigned by the compiler.
    pub register: u32,
    /// System value type (`D3D_NAME`) as a raw value; 0 for user semantics.
    pub system_value_type: u32,
    /// Register component type.
    pub component_type: ComponentType,
    /// Component presence mask.
    pub mask: u8,
    /// Read/write mask.
    pub read_write_mask: u8,
    /// Geometry-shader output stream; 0 when the layout has no stream field.
    pub stream: u32,
    /// Minimum precision (`D3D_MIN_PRECISION`); 0 when the layout has no such field.
    pub min_precision: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryLayout {
    /// `ISGN`/`OSGN`/`PCSG`: 24 bytes.
    Basic,
    /// `OSG5`: 28 bytes, stream first.
    WithStream,
    /// `ISG1`/`OSG1`: 32 bytes, stream first, min precision last.
    WithStreamAndPrecision,
}

impl EntryLayout {
    fn for_fourcc(fourcc: FourCC) -> Self {
        match fourcc.0[3] {
            b'5' => Self::WithStream,
            b'1' => Self::WithStreamAndPrecision,
            _ => Self::Basic,
        }
    }

    fn entry_len(self) -> usize {
        match self {
            Self::Basic => 24,
            Self::WithStream => 28,
            Self::WithStreamAndPrecision => 32,
        }
    }
}

/// Parses a signature chunk payload written in the basic 24-byte layout.
pub fn parse_signature_chunk(bytes: &[u8]) -> Result<SignatureChunk, DxbcError> {
    parse_with_layout(EntryLayout::Basic, bytes)
}

/// Parses a signature chunk payload using the entry layout implied by `fourcc`.
pub fn parse_signature_chunk_with_fourcc(
    fourcc: FourCC,
    bytes: &[u8],
) -> Result<SignatureChunk, DxbcError> {
    parse_with_layout(EntryLayout::for_fourcc(fourcc), bytes)
}

fn parse_with_layout(layout: EntryLayout, bytes: &[u8]) -> Result<SignatureChunk, DxbcError> {
    if bytes.len() < SIGNATURE_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "signature chunk is truncated: need {SIGNATURE_HEADER_LEN} bytes for header, got {}",
            bytes.len()
        )));
    }

    let param_count = read_u32(bytes, 0, "param_count")?;
    let param_offset = read_u32(bytes, 4, "param_offset")?;
    if param_count == 0 {
        return Ok(SignatureChunk::default());
    }
    if (param_offset as usize) < SIGNATURE_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "param_offset {param_offset} points into signature header \
             (need >= {SIGNATURE_HEADER_LEN})"
        )));
    }

    let entry_len = layout.entry_len();
    let rows = table(bytes, param_offset, param_count, entry_len, "signature table")?;

    let mut entries = Vec::new();
    entries.try_reserve_exact(param_count as usize).map_err(|_| {
        DxbcError::invalid_chunk(format!(
            "signature entry count {param_count} is too large to allocate"
        ))
    })?;

    for (index, row) in rows.chunks_exact(entry_len).enumerate() {
        entries.push(parse_entry(layout, bytes, row).map_err(|err| {
            DxbcError::invalid_chunk(format!("signature entry {index}: {}", err.context()))
        })?);
    }

    Ok(SignatureChunk { entries })
}

fn parse_entry(layout: EntryLayout, chunk: &[u8], row: &[u8]) -> Result<SignatureEntry, DxbcError> {
    // Layouts with a stream field carry it as the leading DWORD.
    let (stream, base) = match layout {
        EntryLayout::Basic => (0, 0),
        EntryLayout::WithStream | EntryLayout::WithStreamAndPrecision => {
            (read_u32(row, 0, "stream")?, 4)
        }
    };

    let name_offset = read_u32(row, base, "semantic_name_offset")?;
    let semantic_name = read_cstr(chunk, name_offset as usize, "semantic_name")?.to_owned();
    let semantic_index = read_u32(row, base + 4, "semantic_index")?;
    let system_value_type = read_u32(row, base + 8, "system_value_type")?;
    let component_type = ComponentType::from_raw(read_u32(row, base + 12, "component_type")?);
    let register = read_u32(row, base + 16, "register")?;
    let mask = read_u8(row, base + 20, "mask")?;
    let read_write_mask = read_u8(row, base + 21, "read_write_mask")?;
    let min_precision = match layout {
        EntryLayout::WithStreamAndPrecision => read_u32(row, base + 24, "min_precision")?,
        _ => 0,
    };

    Ok(SignatureEntry {
        semantic_name,
        semantic_index,
        register,
        system_value_type,
        component_type,
        mask,
        read_write_mask,
        stream,
        min_precision,
    })
}
