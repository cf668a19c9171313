//! The device seam: everything a [`ShaderProgram`](crate::ShaderProgram) asks of the GPU.
//!
//! Methods take `&self` so a device handle can be shared between many programs and the
//! caller's own rendering code. Handles are plain ids; the device owns the objects behind
//! them.

use bitflags::bitflags;
use thiserror::Error;

use crate::input_layout::InputElementDesc;
use crate::stage::ShaderStage;
use crate::stream_out::StreamOutEntry;

/// Number of stream-output targets a geometry shader can write.
pub const STREAM_OUTPUT_SLOTS: usize = 4;

/// Handle to a created shader object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Handle to a GPU buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Handle to a vertex input layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputLayoutId(pub u32);

/// Handle to a shader resource view (textures, structured/byte-address buffers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderResourceViewId(pub u32);

/// Handle to a sampler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerId(pub u32);

/// Handle to an unordered access view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UnorderedAccessViewId(pub u32);

bitflags! {
    /// How a buffer may be bound to the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        const CONSTANT_BUFFER = 0x4;
        const SHADER_RESOURCE = 0x8;
        const STREAM_OUTPUT = 0x10;
        const UNORDERED_ACCESS = 0x80;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub byte_width: u32,
    pub bind_flags: BindFlags,
}

impl BufferDesc {
    /// A constant buffer of `byte_width` bytes.
    pub fn constant(byte_width: u32) -> Self {
        Self {
            byte_width,
            bind_flags: BindFlags::CONSTANT_BUFFER,
        }
    }
}

/// Geometry-shader creation parameters when writing to stream output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutputDesc<'a> {
    pub declaration: &'a [StreamOutEntry],
    pub buffer_strides: &'a [u32],
    /// Stream sent to the rasterizer, or `None` to rasterize nothing.
    pub rasterized_stream: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device rejected {what}: {reason}")]
    Rejected { what: &'static str, reason: String },
    #[error("out of device memory")]
    OutOfMemory,
    #[error("device lost")]
    DeviceLost,
}

/// The GPU operations a shader program needs. Modeled on an immediate D3D11 context.
pub trait GpuDevice {
    fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> Result<ShaderId, DeviceError>;

    fn create_geometry_shader_with_stream_output(
        &self,
        bytecode: &[u8],
        stream_output: &StreamOutputDesc<'_>,
    ) -> Result<ShaderId, DeviceError>;

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferId, DeviceError>;

    /// Creates an input layout validated against the vertex shader `bytecode`.
    fn create_input_layout(
        &self,
        elements: &[InputElementDesc],
        bytecode: &[u8],
    ) -> Result<InputLayoutId, DeviceError>;

    /// Replaces the whole contents of `buffer`.
    fn update_buffer(&self, buffer: BufferId, data: &[u8]);

    fn set_shader(&self, stage: ShaderStage, shader: Option<ShaderId>);

    fn set_input_layout(&self, layout: Option<InputLayoutId>);

    fn set_constant_buffer(&self, stage: ShaderStage, slot: u32, buffer: Option<BufferId>);

    fn set_shader_resource(
        &self,
        stage: ShaderStage,
        slot: u32,
        view: Option<ShaderResourceViewId>,
    );

    fn set_sampler(&self, stage: ShaderStage, slot: u32, sampler: Option<SamplerId>);

    /// Binds a compute-stage UAV. `initial_count` seeds append/consume counters;
    /// `u32::MAX` keeps the current value.
    fn set_unordered_access_view(
        &self,
        slot: u32,
        view: Option<UnorderedAccessViewId>,
        initial_count: u32,
    );

    fn set_stream_output_targets(
        &self,
        targets: &[Option<BufferId>; STREAM_OUTPUT_SLOTS],
        offsets: &[u32; STREAM_OUTPUT_SLOTS],
    );

    fn dispatch(&self, groups_x: u32, groups_y: u32, groups_z: u32);

    fn release_shader(&self, shader: ShaderId);

    fn release_buffer(&self, buffer: BufferId);

    fn release_input_layout(&self, layout: InputLayoutId);
}

impl<T: GpuDevice + ?Sized> GpuDevice for &T {
    fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> Result<ShaderId, DeviceError> {
        (**self).create_shader(stage, bytecode)
    }

    fn create_geometry_shader_with_stream_output(
        &self,
        bytecode: &[u8],
        stream_output: &StreamOutputDesc<'_>,
    ) -> Result<ShaderId, DeviceError> {
        (**self).create_geometry_shader_with_stream_output(bytecode, stream_output)
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferId, DeviceError> {
        (**self).create_buffer(desc)
    }

    fn create_input_layout(
        &self,
        elements: &[InputElementDesc],
        bytecode: &[u8],
    ) -> Result<InputLayoutId, DeviceError> {
        (**self).create_input_layout(elements, bytecode)
    }

    fn update_buffer(&self, buffer: BufferId, data: &[u8]) {
        (**self).update_buffer(buffer, data)
    }

    fn set_shader(&self, stage: ShaderStage, shader: Option<ShaderId>) {
        (**self).set_shader(stage, shader)
    }

    fn set_input_layout(&self, layout: Option<InputLayoutId>) {
        (**self).set_input_layout(layout)
    }

    fn set_constant_buffer(&self, stage: ShaderStage, slot: u32, buffer: Option<BufferId>) {
        (**self).set_constant_buffer(stage, slot, buffer)
    }

    fn set_shader_resource(
        &self,
        stage: ShaderStage,
        slot: u32,
        view: Option<ShaderResourceViewId>,
    ) {
        (**self).set_shader_resource(stage, slot, view)
    }

    fn set_sampler(&self, stage: ShaderStage, slot: u32, sampler: Option<SamplerId>) {
        (**self).set_sampler(stage, slot, sampler)
    }

    fn set_unordered_access_view(
        &self,
        slot: u32,
        view: Option<UnorderedAccessViewId>,
        initial_count: u32,
    ) {
        (**self).set_unordered_access_view(slot, view, initial_count)
    }

    fn set_stream_output_targets(
        &self,
        targets: &[Option<BufferId>; STREAM_OUTPUT_SLOTS],
        offsets: &[u32; STREAM_OUTPUT_SLOTS],
    ) {
        (**self).set_stream_output_targets(targets, offsets)
    }

    fn dispatch(&self, groups_x: u32, groups_y: u32, groups_z: u32) {
        (**self).dispatch(groups_x, groups_y, groups_z)
    }

    fn release_shader(&self, shader: ShaderId) {
        (**self).release_shader(shader)
    }

    fn release_buffer(&self, buffer: BufferId) {
        (**self).release_buffer(buffer)
    }

    fn release_input_layout(&self, layout: InputLayoutId) {
        (**self).release_input_layout(layout)
    }
}
