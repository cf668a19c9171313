use thiserror::Error;

/// Errors produced while parsing a `DXBC` container or one of its chunks.
///
/// Every variant except [`DxbcError::MissingChunk`] carries a human-readable
/// context string describing which field or offset failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DxbcError {
    /// The fixed container header is truncated or has the wrong magic.
    #[error("malformed DXBC header: {context}")]
    MalformedHeader {
        /// What went wrong.
        context: String,
    },
    /// The chunk offset table points somewhere it must not.
    #[error("malformed DXBC chunk offsets: {context}")]
    MalformedOffsets {
        /// What went wrong.
        context: String,
    },
    /// A size or offset runs past the end of the container.
    #[error("DXBC out of bounds: {context}")]
    OutOfBounds {
        /// What went wrong.
        context: String,
    },
    /// A chunk payload (`RDEF`, `ISGN`, ...) failed to parse.
    #[error("invalid DXBC chunk: {context}")]
    InvalidChunk {
        /// What went wrong.
        context: String,
    },
    /// The SM4/SM5 token stream inside `SHDR`/`SHEX` is malformed.
    #[error("invalid shader bytecode: {context}")]
    InvalidShader {
        /// What went wrong.
        context: String,
    },
    /// A chunk required for the requested operation is absent.
    #[error("DXBC container is missing a {0} chunk")]
    MissingChunk(&'static str),
}

impl DxbcError {
    pub(crate) fn malformed_header(context: impl Into<String>) -> Self {
        Self::MalformedHeader {
            context: context.into(),
        }
    }

    pub(crate) fn malformed_offsets(context: impl Into<String>) -> Self {
        Self::MalformedOffsets {
            context: context.into(),
        }
    }

    pub(crate) fn out_of_bounds(context: impl Into<String>) -> Self {
        Self::OutOfBounds {
            context: context.into(),
        }
    }

    pub(crate) fn invalid_chunk(context: impl Into<String>) -> Self {
        Self::InvalidChunk {
            context: context.into(),
        }
    }

    pub(crate) fn invalid_shader(context: impl Into<String>) -> Self {
        Self::InvalidShader {
            context: context.into(),
        }
    }

    /// Returns the context string without the variant prefix.
    pub fn context(&self) -> &str {
        match self {
            Self::MalformedHeader { context }
            | Self::MalformedOffsets { context }
            | Self::OutOfBounds { context }
            | Self::InvalidChunk { context }
            | Self::InvalidShader { context } => context,
            Self::MissingChunk(name) => name,
        }
    }
}
