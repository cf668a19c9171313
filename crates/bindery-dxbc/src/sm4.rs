use core::fmt;

use crate::{DxbcError, DxbcFile};

const OPCODE_MASK: u32 = 0x7ff;
const OPCODE_LEN_SHIFT: u32 = 24;
const OPCODE_LEN_MASK: u32 = 0x7f;

const OPCODE_CUSTOMDATA: u32 = 0x35;
const OPCODE_DCL_THREAD_GROUP: u32 = 0x9b;

/// The pipeline stage a shader program targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader (`vs_*`).
    Vertex,
    /// Pixel shader (`ps_*`).
    Pixel,
    /// Geometry shader (`gs_*`).
    Geometry,
    /// Hull shader (`hs_*`).
    Hull,
    /// Domain shader (`ds_*`).
    Domain,
    /// Compute shader (`cs_*`).
    Compute,
    /// Unrecognized program type.
    Unknown(u16),
}

impl ShaderStage {
    /// Short HLSL-profile style prefix (`vs`, `ps`, ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Vertex => "vs",
            Self::Pixel => "ps",
            Self::Geometry => "gs",
            Self::Hull => "hs",
            Self::Domain => "ds",
            Self::Compute => "cs",
            Self::Unknown(_) => "??",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Pixel => f.write_str("pixel"),
            Self::Geometry => f.write_str("geometry"),
            Self::Hull => f.write_str("hull"),
            Self::Domain => f.write_str("domain"),
            Self::Compute => f.write_str("compute"),
            Self::Unknown(ty) => write!(f, "unknown({ty})"),
        }
    }
}

/// Shader model version (`5_0`, `4_1`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderModel {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl fmt::Display for ShaderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.major, self.minor)
    }
}

/// The token stream of an `SHDR`/`SHEX` chunk.
#[derive(Debug, Clone)]
pub struct Sm4Program {
    /// Stage decoded from the version token.
    pub stage: ShaderStage,
    /// Shader model decoded from the version token.
    pub model: ShaderModel,
    /// Token stream truncated to the declared length, including version + length.
    pub tokens: Vec<u32>,
}

impl Sm4Program {
    /// Parses a whole `DXBC` blob and extracts its shader chunk.
    pub fn parse_from_dxbc_bytes(bytes: &[u8]) -> Result<Self, DxbcError> {
        let file = DxbcFile::parse(bytes)?;
        Self::parse_from_dxbc(&file)
    }

    /// Parses the shader chunk of `dxbc`, preferring `SHEX` over `SHDR`.
    pub fn parse_from_dxbc(dxbc: &DxbcFile<'_>) -> Result<Self, DxbcError> {
        let chunk = dxbc
            .shader_chunk()
            .ok_or(DxbcError::MissingChunk("SHDR/SHEX"))?;
        Self::parse_program_tokens(chunk.data)
    }

    /// Parses raw `SHDR`/`SHEX` chunk bytes.
    pub fn parse_program_tokens(bytes: &[u8]) -> Result<Self, DxbcError> {
        if bytes.len() % 4 != 0 {
            return Err(DxbcError::invalid_shader(format!(
                "token stream length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let mut tokens: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if tokens.len() < 2 {
            return Err(DxbcError::invalid_shader(format!(
                "token stream has {} dwords, need at least 2",
                tokens.len()
            )));
        }

        let declared_len = tokens[1] as usize;
        if declared_len < 2 || declared_len > tokens.len() {
            return Err(DxbcError::invalid_shader(format!(
                "declared length {declared_len} dwords does not fit in {} available",
                tokens.len()
            )));
        }
        tokens.truncate(declared_len);

        let (stage, model) = decode_version_token(tokens[0]);
        Ok(Self {
            stage,
            model,
            tokens,
        })
    }

    /// Returns the `dcl_thread_group` dimensions, if the program declares them.
    ///
    /// Only the declaration block is needed, but the scan walks instruction lengths until
    /// the token stream ends, so a malformed length anywhere before the declaration is
    /// reported as an error.
    pub fn thread_group_size(&self) -> Result<Option<[u32; 3]>, DxbcError> {
        let mut pos = 2usize;
        while pos < self.tokens.len() {
            let token = self.tokens[pos];
            let opcode = token & OPCODE_MASK;
            let len = if opcode == OPCODE_CUSTOMDATA {
                // Custom data blocks store their full length in the next dword.
                self.tokens.get(pos + 1).copied().ok_or_else(|| {
                    DxbcError::invalid_shader(format!("customdata at dword {pos} is truncated"))
                })? as usize
            } else {
                ((token >> OPCODE_LEN_SHIFT) & OPCODE_LEN_MASK) as usize
            };
            if len == 0 {
                return Err(DxbcError::invalid_shader(format!(
                    "instruction at dword {pos} (opcode {opcode}) has zero length"
                )));
            }
            let end = pos.checked_add(len).filter(|&end| end <= self.tokens.len()).ok_or_else(|| {
                DxbcError::invalid_shader(format!(
                    "instruction at dword {pos} with length {len} overruns {} dwords",
                    self.tokens.len()
                ))
            })?;

            if opcode == OPCODE_DCL_THREAD_GROUP {
                if len < 4 {
                    return Err(DxbcError::invalid_shader(format!(
                        "dcl_thread_group at dword {pos} has length {len}, need 4"
                    )));
                }
                return Ok(Some([
                    self.tokens[pos + 1],
                    self.tokens[pos + 2],
                    self.tokens[pos + 3],
                ]));
            }
            pos = end;
        }
        Ok(None)
    }
}

/// Splits an SM4/SM5 version token into stage and shader model.
pub fn decode_version_token(version: u32) -> (ShaderStage, ShaderModel) {
    // bits 0..=3: minor version
    // bits 4..=7: major version
    // bits 16..=31: program type
    let minor = (version & 0xF) as u8;
    let major = ((version >> 4) & 0xF) as u8;
    let ty = (version >> 16) as u16;

    let stage = match ty {
        0 => ShaderStage::Pixel,
        1 => ShaderStage::Vertex,
        2 => ShaderStage::Geometry,
        3 => ShaderStage::Hull,
        4 => ShaderStage::Domain,
        5 => ShaderStage::Compute,
        other => ShaderStage::Unknown(other),
    };

    (stage, ShaderModel { major, minor })
}
