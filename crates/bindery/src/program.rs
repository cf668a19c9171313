use core::fmt;
use std::path::Path;

use bindery_dxbc::{CbufferType, ShaderDescription};
use tracing::debug;

use crate::compute;
use crate::device::{
    BufferId, GpuDevice, InputLayoutId, SamplerId, ShaderId, ShaderResourceViewId,
    UnorderedAccessViewId, STREAM_OUTPUT_SLOTS,
};
use crate::diagnostics::Diagnostics;
use crate::error::ShaderError;
use crate::input_layout::InputElementDesc;
use crate::stage::{ShaderStage, StageConfig, StageExt, StageOps};
use crate::stream_out::StreamOutEntry;
use crate::tables::{
    BindingTables, ConstantBuffer, Key, SamplerSlot, ShaderResource, ShaderVariable,
};

/// A compiled shader for one pipeline stage, with its reflected bindings.
///
/// Values are staged by name on the CPU with the `set_*` methods, pushed to the GPU with
/// [`upload_all`](Self::upload_all) or [`upload_one`](Self::upload_one), and bound with
/// [`activate`](Self::activate).
///
/// A program that failed to load is *invalid*: its tables are empty and every call returns
/// `false`/`None` without touching the device. Failures are reported through the
/// [`Diagnostics`] given at construction.
///
/// Dropping the program releases the shader, its constant buffers and a synthesized input
/// layout. Views, samplers and caller-supplied layouts are never released.
pub struct ShaderProgram<D: GpuDevice> {
    device: D,
    ops: StageOps<D>,
    ext: StageExt,
    diagnostics: Diagnostics,
    shader: Option<ShaderId>,
    tables: BindingTables,
    description: Option<ShaderDescription>,
}

impl<D: GpuDevice> fmt::Debug for ShaderProgram<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("stage", &self.ops.stage)
            .field("shader", &self.shader)
            .field("buffers", &self.tables.buffers.len())
            .field("resources", &self.tables.resources.len())
            .field("samplers", &self.tables.samplers.len())
            .finish_non_exhaustive()
    }
}

impl<D: GpuDevice> ShaderProgram<D> {
    /// Creates an empty, invalid program. Call [`load`](Self::load) or
    /// [`load_bytes`](Self::load_bytes) to make it usable.
    pub fn new(device: D, config: StageConfig, diagnostics: Diagnostics) -> Self {
        let stage = config.stage();
        Self {
            device,
            ops: StageOps::for_stage(stage),
            ext: StageExt::from_config(config),
            diagnostics,
            shader: None,
            tables: BindingTables::default(),
            description: None,
        }
    }

    /// [`new`](Self::new) followed by [`load_bytes`](Self::load_bytes).
    pub fn from_bytes(
        device: D,
        config: StageConfig,
        diagnostics: Diagnostics,
        bytecode: &[u8],
    ) -> Self {
        let mut program = Self::new(device, config, diagnostics);
        program.load_bytes(bytecode);
        program
    }

    /// [`new`](Self::new) followed by [`load`](Self::load).
    pub fn from_path(
        device: D,
        config: StageConfig,
        diagnostics: Diagnostics,
        path: impl AsRef<Path>,
    ) -> Self {
        let mut program = Self::new(device, config, diagnostics);
        program.load(path);
        program
    }

    /// Reads a compiled shader from `path` and rebuilds the program from it.
    ///
    /// Everything from a previous load is released first, so a failed reload leaves the
    /// program invalid.
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        self.clear();
        let path = path.as_ref();
        let result = std::fs::read(path)
            .map_err(|source| ShaderError::Load {
                path: path.to_owned(),
                source,
            })
            .and_then(|bytes| self.build(&bytes));
        self.finish_load(result)
    }

    /// Like [`load`](Self::load), for a binary already in memory.
    pub fn load_bytes(&mut self, bytecode: &[u8]) -> bool {
        self.clear();
        let result = self.build(bytecode);
        self.finish_load(result)
    }

    fn build(&mut self, bytecode: &[u8]) -> Result<(), ShaderError> {
        let stage = self.ops.stage;
        let desc = bindery_dxbc::reflect(bytecode)?;
        if !stage.matches(desc.stage) {
            return Err(ShaderError::StageMismatch {
                expected: stage,
                found: desc.stage,
            });
        }

        let shader = self
            .ops
            .create(&self.device, &mut self.ext, bytecode, &desc, &self.diagnostics)?;
        self.shader = Some(shader);
        self.tables
            .build(&self.device, stage, &desc, &self.diagnostics)?;

        debug!(
            %stage,
            model = %desc.model,
            buffers = self.tables.buffers.len(),
            variables = self.tables.variables.len(),
            resources = self.tables.resources.len(),
            samplers = self.tables.samplers.len(),
            "loaded shader program"
        );
        self.description = Some(desc);
        Ok(())
    }

    fn finish_load(&mut self, result: Result<(), ShaderError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.diagnostics.report(&err);
                self.clear();
                false
            }
        }
    }

    /// Releases every GPU object this program owns and empties the tables.
    fn clear(&mut self) {
        if let Some(shader) = self.shader.take() {
            self.device.release_shader(shader);
        }
        if let Some(layout) = self.ext.reset() {
            self.device.release_input_layout(layout);
        }
        self.tables.release(&self.device);
        self.description = None;
    }

    fn report<T>(&self, result: Result<T, ShaderError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.diagnostics.report(&err);
                None
            }
        }
    }

    fn require_valid(&self) -> Result<ShaderId, ShaderError> {
        self.shader.ok_or(ShaderError::InvalidProgram)
    }

    fn require_stage(
        &self,
        stage: ShaderStage,
        operation: &'static str,
    ) -> Result<ShaderId, ShaderError> {
        let shader = self.require_valid()?;
        if self.ops.stage != stage {
            return Err(ShaderError::UnsupportedOperation {
                operation,
                stage: self.ops.stage,
            });
        }
        Ok(shader)
    }

    /// `true` once a binary has loaded and its shader object exists.
    pub fn is_valid(&self) -> bool {
        self.shader.is_some()
    }

    /// The pipeline stage chosen at construction.
    pub fn stage(&self) -> ShaderStage {
        self.ops.stage
    }

    /// The device this program creates and binds through.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Which failures this program logs.
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// The reflection result of the loaded binary.
    pub fn description(&self) -> Option<&ShaderDescription> {
        self.description.as_ref()
    }

    // Variable staging.

    /// Copies `data` into the staging bytes of variable `name`.
    ///
    /// Fails without writing anything if the variable is unknown or `data` is longer than
    /// the variable. A shorter `data` leaves the rest of the variable untouched.
    pub fn set_data(&mut self, name: &str, data: &[u8]) -> bool {
        let result = self
            .require_valid()
            .and_then(|_| self.tables.write_variable(name, data));
        self.report(result).is_some()
    }

    /// Stages any plain-old-data value by its in-memory bytes.
    pub fn set_pod<T: bytemuck::Pod>(&mut self, name: &str, value: &T) -> bool {
        self.set_data(name, bytemuck::bytes_of(value))
    }

    /// Stages a 4-byte signed integer.
    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.set_pod(name, &value)
    }

    /// Stages a 4-byte unsigned integer.
    pub fn set_uint(&mut self, name: &str, value: u32) -> bool {
        self.set_pod(name, &value)
    }

    /// Stages a single float.
    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.set_pod(name, &value)
    }

    /// Stages a `float2`.
    pub fn set_float2(&mut self, name: &str, value: [f32; 2]) -> bool {
        self.set_pod(name, &value)
    }

    /// Stages a `float3`.
    pub fn set_float3(&mut self, name: &str, value: [f32; 3]) -> bool {
        self.set_pod(name, &value)
    }

    /// Stages a `float4`.
    pub fn set_float4(&mut self, name: &str, value: [f32; 4]) -> bool {
        self.set_pod(name, &value)
    }

    /// Stages a 4x4 matrix as 16 consecutive floats, row by row as given.
    pub fn set_matrix4x4(&mut self, name: &str, value: [[f32; 4]; 4]) -> bool {
        self.set_pod(name, &value)
    }

    /// Whether a constant-buffer variable called `name` was reflected.
    pub fn has_variable(&self, name: &str) -> bool {
        self.tables.variables.contains(name)
    }

    /// Whether a texture or read-only buffer called `name` was reflected.
    pub fn has_resource(&self, name: &str) -> bool {
        self.tables.resources.contains(name)
    }

    /// Whether a sampler called `name` was reflected.
    pub fn has_sampler(&self, name: &str) -> bool {
        self.tables.samplers.contains(name)
    }

    /// Buffer index, offset and size of variable `name`.
    pub fn variable_info(&self, name: &str) -> Option<ShaderVariable> {
        let result = self
            .tables
            .variables
            .get(name)
            .copied()
            .ok_or_else(|| ShaderError::VariableNotFound(name.to_owned()));
        self.report(result)
    }

    /// Reflection for a constant buffer, by index or name.
    pub fn buffer_info<'k>(&self, key: impl Into<Key<'k>>) -> Option<&ConstantBuffer> {
        let buffers = &self.tables.buffers;
        self.report(buffers.resolve(key.into())).map(|i| buffers.at(i))
    }

    /// Reflection for a shader resource, by index or name.
    pub fn resource_info<'k>(&self, key: impl Into<Key<'k>>) -> Option<&ShaderResource> {
        let resources = &self.tables.resources;
        self.report(resources.resolve(key.into())).map(|i| resources.at(i))
    }

    /// Reflection for a sampler slot, by index or name.
    pub fn sampler_info<'k>(&self, key: impl Into<Key<'k>>) -> Option<&SamplerSlot> {
        let samplers = &self.tables.samplers;
        self.report(samplers.resolve(key.into())).map(|i| samplers.at(i))
    }

    /// Index of the constant buffer called `name`.
    pub fn find_constant_buffer(&self, name: &str) -> Option<usize> {
        self.report(self.tables.buffers.resolve(Key::Name(name)))
    }

    /// Number of constant buffers with a staging copy.
    pub fn buffer_count(&self) -> usize {
        self.tables.buffers.len()
    }

    /// Byte size of constant buffer `index`.
    pub fn buffer_size(&self, index: usize) -> Option<u32> {
        self.buffer_info(index).map(ConstantBuffer::size)
    }

    /// The CPU copy of a constant buffer, as the next upload would send it.
    pub fn staging_bytes<'k>(&self, key: impl Into<Key<'k>>) -> Option<&[u8]> {
        self.buffer_info(key).map(ConstantBuffer::staging)
    }

    // Upload and binding.

    /// Pushes every constant buffer's staging bytes to the GPU.
    pub fn upload_all(&self) {
        if !self.is_valid() {
            return;
        }
        for buffer in self.tables.buffers.entries() {
            self.device.update_buffer(buffer.gpu_buffer, &buffer.staging);
        }
    }

    /// Pushes one constant buffer's staging bytes to the GPU.
    pub fn upload_one<'k>(&self, key: impl Into<Key<'k>>) -> bool {
        let result = self
            .require_valid()
            .and_then(|_| self.tables.buffers.resolve(key.into()));
        let Some(index) = self.report(result) else {
            return false;
        };
        let buffer = self.tables.buffers.at(index);
        self.device.update_buffer(buffer.gpu_buffer, &buffer.staging);
        true
    }

    /// Binds the shader and its constant buffers on the program's stage.
    ///
    /// Only buffers of kind [`CbufferType::ConstantBuffer`] are bound; texture buffers and
    /// the other kinds are skipped.
    pub fn activate(&self) {
        let Some(shader) = self.shader else {
            return;
        };
        let stage = self.ops.stage;
        self.ops.activate(&self.device, &self.ext, shader);
        for buffer in self.tables.buffers.entries() {
            if buffer.kind == CbufferType::ConstantBuffer {
                self.device
                    .set_constant_buffer(stage, buffer.bind_slot, Some(buffer.gpu_buffer));
            }
        }
    }

    /// Binds `view` (or unbinds with `None`) at the slot of resource `name`.
    pub fn set_resource(&self, name: &str, view: Option<ShaderResourceViewId>) -> bool {
        let result = self
            .require_valid()
            .and_then(|_| self.tables.resources.resolve(Key::Name(name)));
        let Some(index) = self.report(result) else {
            return false;
        };
        let slot = self.tables.resources.at(index).bind_slot;
        self.device.set_shader_resource(self.ops.stage, slot, view);
        true
    }

    /// Binds `sampler` (or unbinds with `None`) at the slot of sampler `name`.
    pub fn set_sampler(&self, name: &str, sampler: Option<SamplerId>) -> bool {
        let result = self
            .require_valid()
            .and_then(|_| self.tables.samplers.resolve(Key::Name(name)));
        let Some(index) = self.report(result) else {
            return false;
        };
        let slot = self.tables.samplers.at(index).bind_slot;
        self.device.set_sampler(self.ops.stage, slot, sampler);
        true
    }

    // Vertex stage.

    /// The layout bound on activation: the supplied one, else the synthesized one.
    pub fn input_layout(&self) -> Option<InputLayoutId> {
        match &self.ext {
            StageExt::Vertex(vertex) if self.is_valid() => vertex.layout(),
            _ => None,
        }
    }

    /// Elements of the synthesized input layout. Empty when a layout was supplied.
    pub fn input_layout_elements(&self) -> &[InputElementDesc] {
        match &self.ext {
            StageExt::Vertex(vertex) => vertex.elements(),
            _ => &[],
        }
    }

    /// Whether the input layout reads per-instance data.
    pub fn is_instancing_compatible(&self) -> bool {
        match &self.ext {
            StageExt::Vertex(vertex) => self.is_valid() && vertex.instancing_compatible(),
            _ => false,
        }
    }

    // Geometry stage.

    /// Creates a buffer that can receive `vertex_count` vertices from this program's
    /// stream output. The caller owns the returned buffer.
    pub fn create_compatible_stream_out_buffer(&self, vertex_count: u32) -> Option<BufferId> {
        let result = self.stream_out_buffer(vertex_count);
        self.report(result)
    }

    fn stream_out_buffer(&self, vertex_count: u32) -> Result<BufferId, ShaderError> {
        let StageExt::Geometry(geometry) = &self.ext else {
            return Err(ShaderError::StreamOutputMisuse("program is not a geometry program"));
        };
        if !self.is_valid() {
            return Err(ShaderError::StreamOutputMisuse("program is not valid"));
        }
        let desc = geometry.compatible_buffer_desc(vertex_count)?;
        let buffer = self
            .device
            .create_buffer(&desc)
            .map_err(|source| ShaderError::Create {
                what: "stream output buffer",
                source,
            })?;
        debug!(buffer = buffer.0, bytes = desc.byte_width, "created stream output buffer");
        Ok(buffer)
    }

    /// Clears all stream-output targets.
    pub fn unbind_stream_out_stage(&self) {
        if self.require_stage(ShaderStage::Geometry, "unbind_stream_out_stage").is_err() {
            return;
        }
        self.device
            .set_stream_output_targets(&[None; STREAM_OUTPUT_SLOTS], &[0; STREAM_OUTPUT_SLOTS]);
    }

    /// Bytes per streamed-out vertex; 0 without stream output.
    pub fn stream_out_stride(&self) -> u32 {
        match &self.ext {
            StageExt::Geometry(geometry) => geometry.stride(),
            _ => 0,
        }
    }

    /// Stream-out entries; empty outside the geometry stage.
    pub fn stream_out_declaration(&self) -> &[StreamOutEntry] {
        match &self.ext {
            StageExt::Geometry(geometry) => geometry.declaration(),
            _ => &[],
        }
    }

    // Compute stage.

    /// Dispatches exactly `x * y * z` thread groups.
    pub fn dispatch_by_groups(&self, x: u32, y: u32, z: u32) -> bool {
        let result = self.require_stage(ShaderStage::Compute, "dispatch");
        if self.report(result).is_none() {
            return false;
        }
        self.device.dispatch(x, y, z);
        true
    }

    /// Dispatches enough thread groups to cover `x * y * z` threads.
    pub fn dispatch_by_threads(&self, x: u32, y: u32, z: u32) -> bool {
        let [gx, gy, gz] = compute::groups_for_thread_counts([x, y, z], self.thread_group_size());
        self.dispatch_by_groups(gx, gy, gz)
    }

    /// Binds `view` at the slot of unordered-access resource `name`.
    ///
    /// `initial_count` seeds append/consume counters; pass `u32::MAX` to keep the current
    /// value.
    pub fn set_unordered_access_view(
        &self,
        name: &str,
        view: Option<UnorderedAccessViewId>,
        initial_count: u32,
    ) -> bool {
        let result = self
            .require_stage(ShaderStage::Compute, "set_unordered_access_view")
            .and_then(|_| self.tables.unordered_access.resolve(Key::Name(name)));
        let Some(index) = self.report(result) else {
            return false;
        };
        let slot = self.tables.unordered_access.at(index).bind_slot;
        self.device.set_unordered_access_view(slot, view, initial_count);
        true
    }

    /// Whether an unordered-access binding called `name` was reflected.
    pub fn has_unordered_access_view(&self, name: &str) -> bool {
        self.tables.unordered_access.contains(name)
    }

    /// Bind point of unordered-access binding `name`.
    pub fn unordered_access_slot(&self, name: &str) -> Option<u32> {
        self.tables.unordered_access.get(name).map(|uav| uav.bind_slot)
    }

    /// `dcl_thread_group` dimensions; zeros for other stages.
    pub fn thread_group_size(&self) -> [u32; 3] {
        match &self.ext {
            StageExt::Compute(compute) => compute.thread_group,
            _ => [0; 3],
        }
    }

    /// Product of the thread-group dimensions.
    pub fn threads_per_group(&self) -> u64 {
        match &self.ext {
            StageExt::Compute(compute) => compute.threads_per_group(),
            _ => 0,
        }
    }
}

impl<D: GpuDevice> Drop for ShaderProgram<D> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use bindery_dxbc::test_utils::{BlobBuilder, VarDesc};
    use bindery_dxbc::ShaderStage as Reflected;

    use super::*;
    use crate::recording::{DeviceCmd, RecordingDevice};

    fn pixel_blob() -> Vec<u8> {
        BlobBuilder::new(Reflected::Pixel)
            .rdef(|r| {
                r.cbuffer(
                    "Material",
                    2,
                    32,
                    vec![VarDesc::new("tint", 0, 16), VarDesc::new("gloss", 16, 4)],
                )
            })
            .build()
    }

    fn load_pixel(device: &RecordingDevice) -> ShaderProgram<&RecordingDevice> {
        ShaderProgram::from_bytes(device, StageConfig::Pixel, Diagnostics::QUIET, &pixel_blob())
    }

    #[test]
    fn failed_setter_leaves_staging_alone() {
        let device = RecordingDevice::new();
        let mut program = load_pixel(&device);
        assert!(program.is_valid());

        assert!(program.set_float("gloss", 0.5));
        assert!(!program.set_float2("gloss", [1.0, 2.0]));
        assert_eq!(&program.staging_bytes("Material").unwrap()[16..20], &0.5f32.to_le_bytes());
    }

    #[test]
    fn activate_binds_at_reflected_slot() {
        let device = RecordingDevice::new();
        let program = load_pixel(&device);
        let buffer = program.buffer_info(0usize).unwrap().gpu_buffer();
        device.take_commands();

        program.activate();
        let commands = device.take_commands();
        assert!(matches!(
            commands[0],
            DeviceCmd::SetShader {
                stage: ShaderStage::Pixel,
                shader: Some(_)
            }
        ));
        assert_eq!(
            commands[1],
            DeviceCmd::SetConstantBuffer {
                stage: ShaderStage::Pixel,
                slot: 2,
                buffer: Some(buffer)
            }
        );
    }

    #[test]
    fn wrong_stage_is_rejected() {
        let device = RecordingDevice::new();
        let blob = pixel_blob();
        let program =
            ShaderProgram::from_bytes(&device, StageConfig::vertex(), Diagnostics::QUIET, &blob);
        assert!(!program.is_valid());
        assert_eq!(device.live_shaders(), 0);
        assert_eq!(device.live_buffers(), 0);
    }
}
