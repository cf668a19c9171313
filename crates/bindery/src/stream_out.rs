//! Geometry stage: stream-output declaration and compatible buffer creation.

use bindery_dxbc::{ShaderDescription, SignatureEntry};
use tracing::debug;

use crate::device::{BindFlags, BufferDesc, GpuDevice, ShaderId, StreamOutputDesc};
use crate::diagnostics::Diagnostics;
use crate::error::ShaderError;
use crate::stage::{self, ShaderStage, StageExt};

/// Enables stream output for a geometry program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamOutOptions {
    /// Send stream 0 to the rasterizer as well. When `false` nothing is rasterized.
    pub rasterize_stream: bool,
}

/// One element of a stream-output declaration (`D3D11_SO_DECLARATION_ENTRY`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutEntry {
    pub stream: u32,
    pub semantic_name: String,
    pub semantic_index: u32,
    pub start_component: u8,
    pub component_count: u8,
    pub output_slot: u8,
}

/// Builds a declaration that writes every output signature entry to slot 0, in order.
///
/// Returns the declaration and the vertex stride in bytes.
pub fn stream_out_declaration(signature: &[SignatureEntry]) -> (Vec<StreamOutEntry>, u32) {
    let declaration: Vec<StreamOutEntry> = signature
        .iter()
        .map(|entry| StreamOutEntry {
            stream: entry.stream,
            semantic_name: entry.semantic_name.clone(),
            semantic_index: entry.semantic_index,
            start_component: 0,
            component_count: (entry.mask & 0xF).count_ones() as u8,
            output_slot: 0,
        })
        .collect();
    let stride = declaration
        .iter()
        .map(|e| u32::from(e.component_count) * 4)
        .sum();
    (declaration, stride)
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GeometryExt {
    options: Option<StreamOutOptions>,
    declaration: Vec<StreamOutEntry>,
    stride: u32,
}

impl GeometryExt {
    pub(crate) fn new(options: Option<StreamOutOptions>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub(crate) fn reset(&mut self) {
        self.declaration.clear();
        self.stride = 0;
    }

    pub(crate) fn uses_stream_out(&self) -> bool {
        self.options.is_some()
    }

    pub(crate) fn declaration(&self) -> &[StreamOutEntry] {
        &self.declaration
    }

    pub(crate) fn stride(&self) -> u32 {
        self.stride
    }

    /// Describes a buffer that can hold `vertex_count` streamed-out vertices.
    pub(crate) fn compatible_buffer_desc(
        &self,
        vertex_count: u32,
    ) -> Result<BufferDesc, ShaderError> {
        if !self.uses_stream_out() {
            return Err(ShaderError::StreamOutputMisuse(
                "program was not created with stream output enabled",
            ));
        }
        if self.stride == 0 {
            return Err(ShaderError::StreamOutputMisuse(
                "stream output stride is zero",
            ));
        }
        let byte_width = self.stride.checked_mul(vertex_count).ok_or(
            ShaderError::StreamOutputMisuse("stream output buffer size overflows"),
        )?;
        Ok(BufferDesc {
            byte_width,
            bind_flags: BindFlags::STREAM_OUTPUT | BindFlags::VERTEX_BUFFER,
        })
    }
}

pub(crate) fn create_geometry<D: GpuDevice>(
    device: &D,
    stage: ShaderStage,
    ext: &mut StageExt,
    bytecode: &[u8],
    desc: &ShaderDescription,
    diagnostics: &Diagnostics,
) -> Result<ShaderId, ShaderError> {
    let options = match ext {
        StageExt::Geometry(geometry) => geometry.options,
        _ => None,
    };
    let Some(options) = options else {
        return stage::create_plain(device, stage, ext, bytecode, desc, diagnostics);
    };

    let (declaration, stride) = stream_out_declaration(&desc.output_signature);
    let shader = device
        .create_geometry_shader_with_stream_output(
            bytecode,
            &StreamOutputDesc {
                declaration: &declaration,
                buffer_strides: &[stride],
                rasterized_stream: options.rasterize_stream.then_some(0),
            },
        )
        .map_err(|source| ShaderError::Create {
            what: "geometry shader with stream output",
            source,
        })?;
    debug!(
        shader = shader.0,
        entries = declaration.len(),
        stride,
        rasterize = options.rasterize_stream,
        "created geometry shader with stream output"
    );

    if let StageExt::Geometry(geometry) = ext {
        geometry.declaration = declaration;
        geometry.stride = stride;
    }
    Ok(shader)
}
