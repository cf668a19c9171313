//! Vertex stage: input layout synthesis from the reflected input signature.

use bindery_dxbc::{ComponentType, ShaderDescription, SignatureEntry};
use tracing::debug;

use crate::device::{GpuDevice, InputLayoutId, ShaderId};
use crate::diagnostics::Diagnostics;
use crate::error::{Severity, ShaderError};
use crate::stage::{self, ShaderStage, StageExt};

/// Places an element directly after the previous one in the same slot.
pub const APPEND_ALIGNED_ELEMENT: u32 = u32::MAX;

/// Semantic suffix that routes a signature entry to the per-instance slot.
pub const PER_INSTANCE_SUFFIX: &str = "_PER_INSTANCE";

const PER_VERTEX_SLOT: u32 = 0;
const PER_INSTANCE_SLOT: u32 = 1;

/// Vertex attribute formats the synthesizer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R32Uint,
    R32Sint,
    R32Float,
    Rg32Uint,
    Rg32Sint,
    Rg32Float,
    Rgb32Uint,
    Rgb32Sint,
    Rgb32Float,
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Float,
    Unknown,
}

impl Format {
    /// Picks a format from a signature mask and component type.
    ///
    /// The mask is treated as a component count: `1`, `<= 3`, `<= 7` and `<= 15` give one
    /// to four components. Larger masks and non-32-bit component types are `Unknown`.
    pub fn from_signature(mask: u8, component_type: ComponentType) -> Self {
        use ComponentType::{Float32, Sint32, Uint32};
        let components = match mask {
            1 => 1,
            m if m <= 3 => 2,
            m if m <= 7 => 3,
            m if m <= 15 => 4,
            _ => return Self::Unknown,
        };
        match (components, component_type) {
            (1, Uint32) => Self::R32Uint,
            (1, Sint32) => Self::R32Sint,
            (1, Float32) => Self::R32Float,
            (2, Uint32) => Self::Rg32Uint,
            (2, Sint32) => Self::Rg32Sint,
            (2, Float32) => Self::Rg32Float,
            (3, Uint32) => Self::Rgb32Uint,
            (3, Sint32) => Self::Rgb32Sint,
            (3, Float32) => Self::Rgb32Float,
            (4, Uint32) => Self::Rgba32Uint,
            (4, Sint32) => Self::Rgba32Sint,
            (4, Float32) => Self::Rgba32Float,
            _ => Self::Unknown,
        }
    }

    pub fn component_count(self) -> u32 {
        match self {
            Self::R32Uint | Self::R32Sint | Self::R32Float => 1,
            Self::Rg32Uint | Self::Rg32Sint | Self::Rg32Float => 2,
            Self::Rgb32Uint | Self::Rgb32Sint | Self::Rgb32Float => 3,
            Self::Rgba32Uint | Self::Rgba32Sint | Self::Rgba32Float => 4,
            Self::Unknown => 0,
        }
    }

    pub fn size_bytes(self) -> u32 {
        self.component_count() * 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputClassification {
    PerVertex,
    PerInstance,
}

/// One element of an input layout (`D3D11_INPUT_ELEMENT_DESC`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElementDesc {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: Format,
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
    pub input_slot_class: InputClassification,
    pub instance_data_step_rate: u32,
}

/// A layout created by the caller, used instead of synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLayout {
    pub id: InputLayoutId,
    /// Whether the layout reads per-instance data.
    pub instancing_compatible: bool,
}

/// Builds one layout element per input signature entry, in signature order.
pub fn synthesize_elements(signature: &[SignatureEntry]) -> Vec<InputElementDesc> {
    signature
        .iter()
        .map(|entry| {
            let per_instance = entry.semantic_name.ends_with(PER_INSTANCE_SUFFIX);
            let (input_slot, input_slot_class, instance_data_step_rate) = if per_instance {
                (PER_INSTANCE_SLOT, InputClassification::PerInstance, 1)
            } else {
                (PER_VERTEX_SLOT, InputClassification::PerVertex, 0)
            };
            InputElementDesc {
                semantic_name: entry.semantic_name.clone(),
                semantic_index: entry.semantic_index,
                format: Format::from_signature(entry.mask, entry.component_type),
                input_slot,
                aligned_byte_offset: APPEND_ALIGNED_ELEMENT,
                input_slot_class,
                instance_data_step_rate,
            }
        })
        .collect()
}

/// Resolves [`APPEND_ALIGNED_ELEMENT`] offsets to concrete byte offsets, per slot.
pub fn resolve_offsets(elements: &[InputElementDesc]) -> Vec<u32> {
    let mut slot_ends = std::collections::HashMap::<u32, u32>::new();
    elements
        .iter()
        .map(|e| {
            let end = slot_ends.entry(e.input_slot).or_insert(0);
            let offset = if e.aligned_byte_offset == APPEND_ALIGNED_ELEMENT {
                *end
            } else {
                e.aligned_byte_offset
            };
            *end = offset + e.format.size_bytes();
            offset
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub(crate) struct VertexExt {
    supplied: Option<InputLayout>,
    synthesized: Option<InputLayoutId>,
    elements: Vec<InputElementDesc>,
    instancing_compatible: bool,
}

impl VertexExt {
    pub(crate) fn new(supplied: Option<InputLayout>) -> Self {
        Self {
            supplied,
            instancing_compatible: supplied.is_some_and(|l| l.instancing_compatible),
            ..Self::default()
        }
    }

    pub(crate) fn reset(&mut self) -> Option<InputLayoutId> {
        self.elements.clear();
        self.instancing_compatible = self.supplied.is_some_and(|l| l.instancing_compatible);
        self.synthesized.take()
    }

    pub(crate) fn layout(&self) -> Option<InputLayoutId> {
        self.supplied.map(|l| l.id).or(self.synthesized)
    }

    pub(crate) fn elements(&self) -> &[InputElementDesc] {
        &self.elements
    }

    pub(crate) fn instancing_compatible(&self) -> bool {
        self.instancing_compatible
    }
}

pub(crate) fn create_vertex<D: GpuDevice>(
    device: &D,
    stage: ShaderStage,
    ext: &mut StageExt,
    bytecode: &[u8],
    desc: &ShaderDescription,
    diagnostics: &Diagnostics,
) -> Result<ShaderId, ShaderError> {
    let shader = stage::create_plain(device, stage, ext, bytecode, desc, diagnostics)?;
    let StageExt::Vertex(vertex) = ext else {
        return Ok(shader);
    };
    if vertex.supplied.is_some() || vertex.synthesized.is_some() {
        return Ok(shader);
    }

    let elements = synthesize_elements(&desc.input_signature);
    vertex.instancing_compatible = elements
        .iter()
        .any(|e| e.input_slot_class == InputClassification::PerInstance);
    if elements.is_empty() {
        debug!("vertex shader has no input signature; no input layout");
        return Ok(shader);
    }

    match device.create_input_layout(&elements, bytecode) {
        Ok(layout) => {
            debug!(
                layout = layout.0,
                elements = elements.len(),
                instancing = vertex.instancing_compatible,
                "synthesized input layout"
            );
            vertex.synthesized = Some(layout);
        }
        // The shader is still usable with a layout bound by the caller.
        Err(source) => diagnostics.report_as(
            Severity::Warning,
            &ShaderError::Create {
                what: "input layout",
                source,
            },
        ),
    }
    vertex.elements = elements;
    Ok(shader)
}

pub(crate) fn activate_vertex<D: GpuDevice>(
    device: &D,
    stage: ShaderStage,
    ext: &StageExt,
    shader: ShaderId,
) {
    stage::activate_plain(device, stage, ext, shader);
    if let StageExt::Vertex(vertex) = ext {
        device.set_input_layout(vertex.layout());
    }
}
