//! Parser for the resource definition chunk (`RDEF`, also spelled `RD11`).
//!
//! `RDEF` describes every constant buffer (with its variables and their types) and every
//! bound resource (textures, samplers, UAVs, the constant buffers themselves). Shader
//! model 5 blobs carry an `RD11` sub-header right after the fixed header that states the
//! size of each table entry; older blobs use the fixed SM4 sizes.

use crate::reader::{read_cstr, read_u16, read_u32, read_u32_opt, table};
use crate::DxbcError;

const RDEF_HEADER_LEN: usize = 28;
const RD11_MAGIC: u32 = u32::from_le_bytes(*b"RD11");

const CBUFFER_DESC_LEN: usize = 24;
const BINDING_DESC_LEN_SM4: usize = 32;
const BINDING_DESC_LEN_SM51: usize = 40;
const VARIABLE_DESC_LEN_SM4: usize = 24;
const TYPE_DESC_LEN_SM4: usize = 16;
const MEMBER_DESC_LEN: usize = 12;

// Struct members may reference each other; real shaders nest only a few levels deep.
const MAX_TYPE_DEPTH: usize = 16;
// Members can share a type offset, so a shallow chunk can still describe an exponential
// tree. Caps the type descriptions expanded per chunk.
const MAX_TYPE_NODES: usize = 1 << 16;

/// What kind of resource a binding describes (`D3D_SHADER_INPUT_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderInputType {
    /// `cbuffer`.
    ConstantBuffer,
    /// `tbuffer`.
    TextureBuffer,
    /// Any `Texture*` object.
    Texture,
    /// `SamplerState` / `SamplerComparisonState`.
    Sampler,
    /// `RWTexture*` / `RWBuffer`.
    UavRwTyped,
    /// `StructuredBuffer`.
    Structured,
    /// `RWStructuredBuffer`.
    UavRwStructured,
    /// `ByteAddressBuffer`.
    ByteAddress,
    /// `RWByteAddressBuffer`.
    UavRwByteAddress,
    /// `AppendStructuredBuffer`.
    UavAppendStructured,
    /// `ConsumeStructuredBuffer`.
    UavConsumeStructured,
    /// `RWStructuredBuffer` with a hidden counter.
    UavRwStructuredWithCounter,
    /// A value this parser does not know about.
    Unknown(u32),
}

impl ShaderInputType {
    /// Decodes a raw `D3D_SHADER_INPUT_TYPE`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::ConstantBuffer,
            1 => Self::TextureBuffer,
            2 => Self::Texture,
            3 => Self::Sampler,
            4 => Self::UavRwTyped,
            5 => Self::Structured,
            6 => Self::UavRwStructured,
            7 => Self::ByteAddress,
            8 => Self::UavRwByteAddress,
            9 => Self::UavAppendStructured,
            10 => Self::UavConsumeStructured,
            11 => Self::UavRwStructuredWithCounter,
            other => Self::Unknown(other),
        }
    }

    /// Returns `true` for the six unordered-access kinds.
    pub fn is_unordered_access(self) -> bool {
        matches!(
            self,
            Self::UavRwTyped
                | Self::UavRwStructured
                | Self::UavRwByteAddress
                | Self::UavAppendStructured
                | Self::UavConsumeStructured
                | Self::UavRwStructuredWithCounter
        )
    }

    /// Returns `true` for read-only views bound as shader resources.
    pub fn is_shader_resource(self) -> bool {
        matches!(self, Self::Texture | Self::Structured | Self::ByteAddress)
    }
}

/// What a reflected constant buffer is (`D3D_CBUFFER_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CbufferType {
    /// A regular `cbuffer`.
    ConstantBuffer,
    /// A `tbuffer`.
    TextureBuffer,
    /// Interface pointer storage.
    InterfacePointers,
    /// Resource binding information.
    ResourceBindInfo,
    /// A value this parser does not know about.
    Unknown(u32),
}

impl CbufferType {
    /// Decodes a raw `D3D_CBUFFER_TYPE`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::ConstantBuffer,
            1 => Self::TextureBuffer,
            2 => Self::InterfacePointers,
            3 => Self::ResourceBindInfo,
            other => Self::Unknown(other),
        }
    }
}

/// A parsed `RDEF` chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RdefChunk {
    /// Packed target: minor version in bits 0..8, major in 8..16, program type in 16..32.
    pub target: u32,
    /// Compile flags.
    pub flags: u32,
    /// Compiler identification string, if present.
    pub creator: Option<String>,
    /// Constant buffers in declaration order.
    pub constant_buffers: Vec<RdefConstantBuffer>,
    /// Bound resources in declaration order.
    pub bound_resources: Vec<RdefResourceBinding>,
}

impl RdefChunk {
    /// Major shader model version from `target`.
    pub fn major_version(&self) -> u8 {
        ((self.target >> 8) & 0xff) as u8
    }

    /// Minor shader model version from `target`.
    pub fn minor_version(&self) -> u8 {
        (self.target & 0xff) as u8
    }

    /// Returns the first binding called `name`.
    pub fn find_binding(&self, name: &str) -> Option<&RdefResourceBinding> {
        self.bound_resources.iter().find(|b| b.name == name)
    }
}

/// A bound resource entry (`D3D11_SHADER_INPUT_BIND_DESC`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefResourceBinding {
    /// Resource name as declared in HLSL.
    pub name: String,
    /// Resource kind.
    pub input_type: ShaderInputType,
    /// `D3D_RESOURCE_RETURN_TYPE`, raw.
    pub return_type: u32,
    /// `D3D_SRV_DIMENSION`, raw.
    pub dimension: u32,
    /// Sample count for MSAA textures, or the structure stride for structured buffers.
    pub num_samples: u32,
    /// First register slot.
    pub bind_point: u32,
    /// Number of contiguous slots (arrays bind more than one).
    pub bind_count: u32,
    /// `D3D_SHADER_INPUT_FLAGS`, raw.
    pub flags: u32,
    /// Register space (SM5.1 only, otherwise 0).
    pub space: u32,
}

/// A constant buffer description with its variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefConstantBuffer {
    /// Buffer name as declared in HLSL.
    pub name: String,
    /// Size in bytes (always a multiple of 16 for compiler output).
    pub size: u32,
    /// `D3D_SHADER_CBUFFER_FLAGS`, raw.
    pub flags: u32,
    /// Buffer kind.
    pub kind: CbufferType,
    /// Variables in declaration order.
    pub variables: Vec<RdefVariable>,
}

/// A variable inside a constant buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefVariable {
    /// Variable name.
    pub name: String,
    /// Byte offset from the start of the owning buffer.
    pub start_offset: u32,
    /// Size in bytes.
    pub size: u32,
    /// `D3D_SHADER_VARIABLE_FLAGS`; bit 1 (`D3D_SVF_USED`) marks variables the shader reads.
    pub flags: u32,
    /// Type description, if the blob carries one.
    pub ty: Option<RdefType>,
}

/// A variable type description (`D3D11_SHADER_TYPE_DESC`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefType {
    /// `D3D_SHADER_VARIABLE_CLASS`, raw (scalar, vector, matrix, struct, ...).
    pub class: u16,
    /// `D3D_SHADER_VARIABLE_TYPE`, raw (float, int, ...).
    pub base_type: u16,
    /// Row count (1 for scalars and vectors).
    pub rows: u16,
    /// Column count.
    pub columns: u16,
    /// Array element count; 0 when not an array.
    pub elements: u16,
    /// Struct members; empty for non-struct types.
    pub members: Vec<RdefStructMember>,
}

/// A member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefStructMember {
    /// Member name.
    pub name: String,
    /// Byte offset from the start of the parent struct.
    pub offset: u32,
    /// Member type.
    pub ty: RdefType,
}

#[derive(Debug, Clone, Copy)]
struct EntrySizes {
    cbuffer: usize,
    binding: usize,
    variable: usize,
    ty: usize,
    member: usize,
}

/// Parses an `RDEF` chunk payload.
pub fn parse_rdef_chunk(bytes: &[u8]) -> Result<RdefChunk, DxbcError> {
    if bytes.len() < RDEF_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "RDEF chunk is truncated: need {RDEF_HEADER_LEN} bytes for header, got {}",
            bytes.len()
        )));
    }

    let cb_count = read_u32(bytes, 0, "constant_buffer_count")?;
    let cb_offset = read_u32(bytes, 4, "constant_buffer_offset")?;
    let res_count = read_u32(bytes, 8, "bound_resource_count")?;
    let res_offset = read_u32(bytes, 12, "bound_resource_offset")?;
    let target = read_u32(bytes, 16, "target")?;
    let flags = read_u32(bytes, 20, "flags")?;
    let creator_offset = read_u32(bytes, 24, "creator_offset")?;

    let major = (target >> 8) & 0xff;
    let sizes = entry_sizes(bytes, major)?;

    // Stripped or hand-built blobs sometimes leave the creator string out.
    let creator = match creator_offset {
        0 => None,
        off => read_cstr(bytes, off as usize, "creator").ok().map(str::to_owned),
    };

    let mut bound_resources = Vec::new();
    let rows = table(bytes, res_offset, res_count, sizes.binding, "bound resource table")?;
    for (index, row) in rows.chunks_exact(sizes.binding).enumerate() {
        let binding = parse_binding(bytes, row, sizes.binding).map_err(|err| {
            DxbcError::invalid_chunk(format!("bound resource {index}: {}", err.context()))
        })?;
        bound_resources.push(binding);
    }

    let mut constant_buffers = Vec::new();
    let mut type_budget = MAX_TYPE_NODES;
    let rows = table(bytes, cb_offset, cb_count, sizes.cbuffer, "constant buffer table")?;
    for (index, row) in rows.chunks_exact(sizes.cbuffer).enumerate() {
        let cb = parse_cbuffer(bytes, row, sizes, &mut type_budget).map_err(|err| {
            DxbcError::invalid_chunk(format!("constant buffer {index}: {}", err.context()))
        })?;
        constant_buffers.push(cb);
    }

    Ok(RdefChunk {
        target,
        flags,
        creator,
        constant_buffers,
        bound_resources,
    })
}

fn entry_sizes(bytes: &[u8], major: u32) -> Result<EntrySizes, DxbcError> {
    let sm4 = EntrySizes {
        cbuffer: CBUFFER_DESC_LEN,
        binding: BINDING_DESC_LEN_SM4,
        variable: VARIABLE_DESC_LEN_SM4,
        ty: TYPE_DESC_LEN_SM4,
        member: MEMBER_DESC_LEN,
    };
    if major < 5 || read_u32_opt(bytes, 28) != Some(RD11_MAGIC) {
        return Ok(sm4);
    }

    // RD11 sub-header: magic, header size, then the cbuffer/binding/variable/type/member
    // entry sizes.
    let size_at = |offset: usize, what: &str, min: usize| -> Result<usize, DxbcError> {
        let size = read_u32(bytes, offset, what)? as usize;
        if size < min {
            return Err(DxbcError::invalid_chunk(format!(
                "RD11 {what} {size} is smaller than the minimum {min}"
            )));
        }
        Ok(size)
    };
    let binding = size_at(40, "binding entry size", BINDING_DESC_LEN_SM4)?;
    Ok(EntrySizes {
        cbuffer: size_at(36, "cbuffer entry size", CBUFFER_DESC_LEN)?,
        binding,
        variable: size_at(44, "variable entry size", VARIABLE_DESC_LEN_SM4)?,
        ty: size_at(48, "type entry size", TYPE_DESC_LEN_SM4)?,
        // Some RD11 headers stop before the member size.
        member: read_u32_opt(bytes, 52)
            .map(|v| v as usize)
            .filter(|&v| v >= MEMBER_DESC_LEN)
            .unwrap_or(MEMBER_DESC_LEN),
    })
}

fn parse_binding(
    chunk: &[u8],
    row: &[u8],
    entry_len: usize,
) -> Result<RdefResourceBinding, DxbcError> {
    let name_offset = read_u32(row, 0, "name_offset")?;
    let space = if entry_len >= BINDING_DESC_LEN_SM51 {
        read_u32(row, 32, "space")?
    } else {
        0
    };
    Ok(RdefResourceBinding {
        name: read_cstr(chunk, name_offset as usize, "binding name")?.to_owned(),
        input_type: ShaderInputType::from_raw(read_u32(row, 4, "input_type")?),
        return_type: read_u32(row, 8, "return_type")?,
        dimension: read_u32(row, 12, "dimension")?,
        num_samples: read_u32(row, 16, "num_samples")?,
        bind_point: read_u32(row, 20, "bind_point")?,
        bind_count: read_u32(row, 24, "bind_count")?,
        flags: read_u32(row, 28, "flags")?,
        space,
    })
}

fn parse_cbuffer(
    chunk: &[u8],
    row: &[u8],
    sizes: EntrySizes,
    type_budget: &mut usize,
) -> Result<RdefConstantBuffer, DxbcError> {
    let name_offset = read_u32(row, 0, "name_offset")?;
    let var_count = read_u32(row, 4, "variable_count")?;
    let var_offset = read_u32(row, 8, "variable_offset")?;
    let size = read_u32(row, 12, "size")?;
    let flags = read_u32(row, 16, "flags")?;
    let kind = CbufferType::from_raw(read_u32(row, 20, "type")?);
    let name = read_cstr(chunk, name_offset as usize, "cbuffer name")?.to_owned();

    let mut variables = Vec::new();
    let rows = table(chunk, var_offset, var_count, sizes.variable, "variable table")?;
    for (index, var_row) in rows.chunks_exact(sizes.variable).enumerate() {
        let var = parse_variable(chunk, var_row, sizes, type_budget).map_err(|err| {
            DxbcError::invalid_chunk(format!("{name} variable {index}: {}", err.context()))
        })?;
        variables.push(var);
    }

    Ok(RdefConstantBuffer {
        name,
        size,
        flags,
        kind,
        variables,
    })
}

fn parse_variable(
    chunk: &[u8],
    row: &[u8],
    sizes: EntrySizes,
    type_budget: &mut usize,
) -> Result<RdefVariable, DxbcError> {
    let name_offset = read_u32(row, 0, "name_offset")?;
    let type_offset = read_u32(row, 16, "type_offset")?;
    let ty = match type_offset {
        0 => None,
        off => Some(parse_type(chunk, off as usize, sizes, 0, type_budget)?),
    };
    Ok(RdefVariable {
        name: read_cstr(chunk, name_offset as usize, "variable name")?.to_owned(),
        start_offset: read_u32(row, 4, "start_offset")?,
        size: read_u32(row, 8, "size")?,
        flags: read_u32(row, 12, "flags")?,
        ty,
    })
}

fn parse_type(
    chunk: &[u8],
    offset: usize,
    sizes: EntrySizes,
    depth: usize,
    budget: &mut usize,
) -> Result<RdefType, DxbcError> {
    if depth >= MAX_TYPE_DEPTH {
        return Err(DxbcError::invalid_chunk(format!(
            "type at offset {offset} nests deeper than {MAX_TYPE_DEPTH} levels"
        )));
    }
    *budget = budget.checked_sub(1).ok_or_else(|| {
        DxbcError::invalid_chunk(format!(
            "type at offset {offset} expands past {MAX_TYPE_NODES} type nodes"
        ))
    })?;
    let desc = table(chunk, offset as u32, 1, sizes.ty, "type description")?;
    let member_count = read_u16(desc, 10, "member_count")?;
    let member_offset = read_u32(desc, 12, "member_offset")?;

    let mut members = Vec::new();
    if member_count > 0 {
        let rows = table(
            chunk,
            member_offset,
            u32::from(member_count),
            sizes.member,
            "struct member table",
        )?;
        for row in rows.chunks_exact(sizes.member) {
            let name_offset = read_u32(row, 0, "member name_offset")?;
            let type_offset = read_u32(row, 4, "member type_offset")?;
            members.push(RdefStructMember {
                name: read_cstr(chunk, name_offset as usize, "member name")?.to_owned(),
                offset: read_u32(row, 8, "member offset")?,
                ty: parse_type(chunk, type_offset as usize, sizes, depth + 1, budget)?,
            });
        }
    }

    Ok(RdefType {
        class: read_u16(desc, 0, "class")?,
        base_type: read_u16(desc, 2, "type")?,
        rows: read_u16(desc, 4, "rows")?,
        columns: read_u16(desc, 6, "columns")?,
        elements: read_u16(desc, 8, "elements")?,
        members,
    })
}
