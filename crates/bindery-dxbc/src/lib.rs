//! A safe parser for compiled Direct3D 10/11 shader containers (`DXBC`), focused on the
//! metadata needed to bind a shader: resource definitions, signatures, stage and shader
//! model, and compute thread-group size.
//!
//! Inputs are treated as untrusted. Every offset is bounds checked and parsing never
//! panics on malformed data.
//!
//! The main entry point is [`reflect`], which produces a [`ShaderDescription`]. The
//! lower-level pieces are public too:
//!
//! - [`DxbcFile`] for container parsing and chunk lookup,
//! - [`parse_signature_chunk_with_fourcc`] for `ISGN`/`OSGN` and their variants,
//! - [`parse_rdef_chunk`] for `RDEF`,
//! - [`Sm4Program`] for the `SHDR`/`SHEX` token stream.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod dxbc;
mod error;
mod fourcc;
/// Parser for resource definition chunks (`RDEF`).
pub mod rdef;
mod reader;
/// Whole-blob reflection.
pub mod reflect;
/// Parsers for signature chunks (`ISGN`, `OSGN`, ...).
pub mod signature;
/// SM4/SM5 token stream helpers for `SHDR`/`SHEX` chunks.
pub mod sm4;

/// Helpers for building synthetic DXBC blobs in tests.
///
/// Only available for this crate's own tests or with the `test-utils` feature. Not part
/// of the stable parsing API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests_rdef;
#[cfg(test)]
mod tests_signature;

pub use crate::dxbc::{DxbcChunk, DxbcFile, DxbcHeader, SignatureKind};
pub use crate::error::DxbcError;
pub use crate::fourcc::FourCC;
pub use crate::rdef::{
    parse_rdef_chunk, CbufferType, RdefChunk, RdefConstantBuffer, RdefResourceBinding,
    RdefStructMember, RdefType, RdefVariable, ShaderInputType,
};
pub use crate::reflect::{reflect, reflect_file, ShaderDescription};
pub use crate::signature::{
    parse_signature_chunk, parse_signature_chunk_with_fourcc, ComponentType, SignatureChunk,
    SignatureEntry,
};
pub use crate::sm4::{decode_version_token, ShaderModel, ShaderStage, Sm4Program};
