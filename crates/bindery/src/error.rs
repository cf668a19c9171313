use std::path::PathBuf;

use bindery_dxbc::DxbcError;
use thiserror::Error;

use crate::device::DeviceError;
use crate::stage::ShaderStage;

/// How loudly a failure is reported through [`Diagnostics`](crate::Diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader binary {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to reflect shader binary: {0}")]
    Reflect(#[from] DxbcError),
    #[error("shader stage mismatch: program is {expected}, binary is {found}")]
    StageMismatch {
        expected: ShaderStage,
        found: bindery_dxbc::ShaderStage,
    },
    #[error("failed to create {what}: {source}")]
    Create {
        what: &'static str,
        #[source]
        source: DeviceError,
    },
    #[error("shader variable {0:?} not found")]
    VariableNotFound(String),
    #[error("data for shader variable {name:?} is {len} bytes, but the variable holds {capacity}")]
    SizeMismatch {
        name: String,
        len: usize,
        capacity: u32,
    },
    #[error("{kind} {name:?} not found")]
    ResourceNotFound { kind: &'static str, name: String },
    #[error("{table} index {index} out of range (len {len})")]
    InvalidIndex {
        table: &'static str,
        index: usize,
        len: usize,
    },
    #[error("stream output misuse: {0}")]
    StreamOutputMisuse(&'static str),
    #[error("{operation} is not available on a {stage} program")]
    UnsupportedOperation {
        operation: &'static str,
        stage: ShaderStage,
    },
    #[error("shader program is not valid")]
    InvalidProgram,
}

impl ShaderError {
    /// Lookup misses and oversized writes are warnings; everything else is an error.
    pub fn severity(&self) -> Severity {
        match self {
            Self::VariableNotFound(_)
            | Self::SizeMismatch { .. }
            | Self::ResourceNotFound { .. }
            | Self::InvalidIndex { .. }
            | Self::InvalidProgram => Severity::Warning,
            Self::Load { .. }
            | Self::Reflect(_)
            | Self::StageMismatch { .. }
            | Self::Create { .. }
            | Self::StreamOutputMisuse(_)
            | Self::UnsupportedOperation { .. } => Severity::Error,
        }
    }
}
