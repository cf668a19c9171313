//! One-shot reflection of a compiled shader blob.

use crate::dxbc::SignatureKind;
use crate::rdef::{RdefConstantBuffer, RdefResourceBinding};
use crate::signature::SignatureEntry;
use crate::sm4::{ShaderModel, ShaderStage, Sm4Program};
use crate::{DxbcError, DxbcFile};

/// Everything the binding layer needs to know about a compiled shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescription {
    /// Stage from the shader chunk's version token.
    pub stage: ShaderStage,
    /// Shader model from the shader chunk's version token.
    pub model: ShaderModel,
    /// Every bound resource, in `RDEF` order.
    pub bound_resources: Vec<RdefResourceBinding>,
    /// Every constant buffer, in `RDEF` order.
    pub constant_buffers: Vec<RdefConstantBuffer>,
    /// Input signature entries.
    pub input_signature: Vec<SignatureEntry>,
    /// Output signature entries.
    pub output_signature: Vec<SignatureEntry>,
    /// `dcl_thread_group` dimensions; only set for compute shaders.
    pub thread_group_size: Option<[u32; 3]>,
}

impl ShaderDescription {
    /// Returns the first bound resource called `name`.
    pub fn find_binding(&self, name: &str) -> Option<&RdefResourceBinding> {
        self.bound_resources.iter().find(|b| b.name == name)
    }

    /// Returns the first constant buffer called `name`.
    pub fn find_constant_buffer(&self, name: &str) -> Option<&RdefConstantBuffer> {
        self.constant_buffers.iter().find(|cb| cb.name == name)
    }
}

/// Reflects a `DXBC` blob.
///
/// Missing `RDEF` or signature chunks produce empty lists. A missing or malformed shader
/// chunk, or a present chunk that fails to parse, is an error.
pub fn reflect(bytes: &[u8]) -> Result<ShaderDescription, DxbcError> {
    let file = DxbcFile::parse(bytes)?;
    reflect_file(&file)
}

/// Like [`reflect`], for an already parsed container.
pub fn reflect_file(file: &DxbcFile<'_>) -> Result<ShaderDescription, DxbcError> {
    let program = Sm4Program::parse_from_dxbc(file)?;

    let rdef = file.get_rdef().transpose()?.unwrap_or_default();
    for cb in &rdef.constant_buffers {
        for var in &cb.variables {
            let end = u64::from(var.start_offset) + u64::from(var.size);
            if end > u64::from(cb.size) {
                return Err(DxbcError::invalid_chunk(format!(
                    "variable {} in {} spans {}..{end}, past the buffer size {}",
                    var.name, cb.name, var.start_offset, cb.size
                )));
            }
        }
    }

    let input_signature = file
        .get_signature(SignatureKind::Input)
        .transpose()?
        .map(|sig| sig.entries)
        .unwrap_or_default();
    let output_signature = file
        .get_signature(SignatureKind::Output)
        .transpose()?
        .map(|sig| sig.entries)
        .unwrap_or_default();

    let thread_group_size = match program.stage {
        ShaderStage::Compute => program.thread_group_size()?,
        _ => None,
    };

    Ok(ShaderDescription {
        stage: program.stage,
        model: program.model,
        bound_resources: rdef.bound_resources,
        constant_buffers: rdef.constant_buffers,
        input_signature,
        output_signature,
        thread_group_size,
    })
}
