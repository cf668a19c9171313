//! An in-memory [`GpuDevice`] that records every call.
//!
//! Used by the tests and by `shader_reflect` to show what a program would do on a real
//! device. Buffer contents are kept so uploads can be inspected, live objects are tracked
//! so leaks show up, and creation calls can be made to fail on demand.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use bitflags::bitflags;

use crate::device::{
    BufferDesc, BufferId, DeviceError, GpuDevice, InputLayoutId, SamplerId, ShaderId,
    ShaderResourceViewId, StreamOutputDesc, UnorderedAccessViewId, STREAM_OUTPUT_SLOTS,
};
use crate::input_layout::InputElementDesc;
use crate::stage::ShaderStage;
use crate::stream_out::StreamOutEntry;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCmd {
    CreateShader {
        stage: ShaderStage,
        shader: ShaderId,
        bytecode_len: usize,
    },
    CreateGeometryShaderWithStreamOutput {
        shader: ShaderId,
        declaration: Vec<StreamOutEntry>,
        buffer_strides: Vec<u32>,
        rasterized_stream: Option<u32>,
    },
    CreateBuffer {
        buffer: BufferId,
        desc: BufferDesc,
    },
    CreateInputLayout {
        layout: InputLayoutId,
        elements: Vec<InputElementDesc>,
    },
    UpdateBuffer {
        buffer: BufferId,
        data: Vec<u8>,
    },
    SetShader {
        stage: ShaderStage,
        shader: Option<ShaderId>,
    },
    SetInputLayout {
        layout: Option<InputLayoutId>,
    },
    SetConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: Option<BufferId>,
    },
    SetShaderResource {
        stage: ShaderStage,
        slot: u32,
        view: Option<ShaderResourceViewId>,
    },
    SetSampler {
        stage: ShaderStage,
        slot: u32,
        sampler: Option<SamplerId>,
    },
    SetUnorderedAccessView {
        slot: u32,
        view: Option<UnorderedAccessViewId>,
        initial_count: u32,
    },
    SetStreamOutputTargets {
        targets: [Option<BufferId>; STREAM_OUTPUT_SLOTS],
        offsets: [u32; STREAM_OUTPUT_SLOTS],
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    ReleaseShader(ShaderId),
    ReleaseBuffer(BufferId),
    ReleaseInputLayout(InputLayoutId),
}

bitflags! {
    /// Creation calls that should fail with [`DeviceError::Rejected`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FailOn: u32 {
        const SHADER = 1 << 0;
        const BUFFER = 1 << 1;
        const INPUT_LAYOUT = 1 << 2;
    }
}

impl Default for FailOn {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    commands: Vec<DeviceCmd>,
    buffers: HashMap<BufferId, Vec<u8>>,
    shaders: HashSet<ShaderId>,
    input_layouts: HashSet<InputLayoutId>,
    fail_on: FailOn,
    // Buffer creations left before they start failing.
    buffers_before_failure: Option<usize>,
}

impl State {
    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, what: FailOn, name: &'static str) -> Result<(), DeviceError> {
        if self.fail_on.intersects(what) {
            return Err(DeviceError::Rejected {
                what: name,
                reason: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

/// A cheaply cloneable handle; clones share the same recorded state.
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    state: Rc<RefCell<State>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the selected creation calls fail until changed again.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.state.borrow_mut().fail_on = fail_on;
    }

    /// Lets `count` more buffers be created, then fails every later buffer creation.
    /// `None` removes the limit.
    pub fn set_fail_buffers_after(&self, count: Option<usize>) {
        self.state.borrow_mut().buffers_before_failure = count;
    }

    pub fn commands(&self) -> Vec<DeviceCmd> {
        self.state.borrow().commands.clone()
    }

    /// Returns and clears the recorded commands. Live objects are kept.
    pub fn take_commands(&self) -> Vec<DeviceCmd> {
        std::mem::take(&mut self.state.borrow_mut().commands)
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_input_layouts(&self) -> usize {
        self.state.borrow().input_layouts.len()
    }

    /// Creates an input layout outside any program, as a caller-supplied layout would be.
    pub fn create_external_input_layout(&self) -> InputLayoutId {
        let mut state = self.state.borrow_mut();
        let layout = InputLayoutId(state.alloc_id());
        state.input_layouts.insert(layout);
        layout
    }

    fn record(&self, cmd: DeviceCmd) {
        self.state.borrow_mut().commands.push(cmd);
    }
}

impl GpuDevice for RecordingDevice {
    fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> Result<ShaderId, DeviceError> {
        let mut state = self.state.borrow_mut();
        state.check(FailOn::SHADER, "shader")?;
        let shader = ShaderId(state.alloc_id());
        state.shaders.insert(shader);
        state.commands.push(DeviceCmd::CreateShader {
            stage,
            shader,
            bytecode_len: bytecode.len(),
        });
        Ok(shader)
    }

    fn create_geometry_shader_with_stream_output(
        &self,
        _bytecode: &[u8],
        stream_output: &StreamOutputDesc<'_>,
    ) -> Result<ShaderId, DeviceError> {
        let mut state = self.state.borrow_mut();
        state.check(FailOn::SHADER, "geometry shader")?;
        let shader = ShaderId(state.alloc_id());
        state.shaders.insert(shader);
        state
            .commands
            .push(DeviceCmd::CreateGeometryShaderWithStreamOutput {
                shader,
                declaration: stream_output.declaration.to_vec(),
                buffer_strides: stream_output.buffer_strides.to_vec(),
                rasterized_stream: stream_output.rasterized_stream,
            });
        Ok(shader)
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferId, DeviceError> {
        let mut state = self.state.borrow_mut();
        state.check(FailOn::BUFFER, "buffer")?;
        if let Some(remaining) = state.buffers_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(DeviceError::Rejected {
                    what: "buffer",
                    reason: "injected failure after earlier buffers".to_owned(),
                });
            }
            *remaining -= 1;
        }
        let buffer = BufferId(state.alloc_id());
        state.buffers.insert(buffer, vec![0; desc.byte_width as usize]);
        state.commands.push(DeviceCmd::CreateBuffer {
            buffer,
            desc: *desc,
        });
        Ok(buffer)
    }

    fn create_input_layout(
        &self,
        elements: &[InputElementDesc],
        _bytecode: &[u8],
    ) -> Result<InputLayoutId, DeviceError> {
        let mut state = self.state.borrow_mut();
        state.check(FailOn::INPUT_LAYOUT, "input layout")?;
        let layout = InputLayoutId(state.alloc_id());
        state.input_layouts.insert(layout);
        state.commands.push(DeviceCmd::CreateInputLayout {
            layout,
            elements: elements.to_vec(),
        });
        Ok(layout)
    }

    fn update_buffer(&self, buffer: BufferId, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        if let Some(contents) = state.buffers.get_mut(&buffer) {
            let len = contents.len().min(data.len());
            contents[..len].copy_from_slice(&data[..len]);
        }
        state.commands.push(DeviceCmd::UpdateBuffer {
            buffer,
            data: data.to_vec(),
        });
    }

    fn set_shader(&self, stage: ShaderStage, shader: Option<ShaderId>) {
        self.record(DeviceCmd::SetShader { stage, shader });
    }

    fn set_input_layout(&self, layout: Option<InputLayoutId>) {
        self.record(DeviceCmd::SetInputLayout { layout });
    }

    fn set_constant_buffer(&self, stage: ShaderStage, slot: u32, buffer: Option<BufferId>) {
        self.record(DeviceCmd::SetConstantBuffer {
            stage,
            slot,
            buffer,
        });
    }

    fn set_shader_resource(
        &self,
        stage: ShaderStage,
        slot: u32,
        view: Option<ShaderResourceViewId>,
    ) {
        self.record(DeviceCmd::SetShaderResource { stage, slot, view });
    }

    fn set_sampler(&self, stage: ShaderStage, slot: u32, sampler: Option<SamplerId>) {
        self.record(DeviceCmd::SetSampler {
            stage,
            slot,
            sampler,
        });
    }

    fn set_unordered_access_view(
        &self,
        slot: u32,
        view: Option<UnorderedAccessViewId>,
        initial_count: u32,
    ) {
        self.record(DeviceCmd::SetUnorderedAccessView {
            slot,
            view,
            initial_count,
        });
    }

    fn set_stream_output_targets(
        &self,
        targets: &[Option<BufferId>; STREAM_OUTPUT_SLOTS],
        offsets: &[u32; STREAM_OUTPUT_SLOTS],
    ) {
        self.record(DeviceCmd::SetStreamOutputTargets {
            targets: *targets,
            offsets: *offsets,
        });
    }

    fn dispatch(&self, x: u32, y: u32, z: u32) {
        self.record(DeviceCmd::Dispatch { x, y, z });
    }

    fn release_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(&shader);
        state.commands.push(DeviceCmd::ReleaseShader(shader));
    }

    fn release_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        state.commands.push(DeviceCmd::ReleaseBuffer(buffer));
    }

    fn release_input_layout(&self, layout: InputLayoutId) {
        let mut state = self.state.borrow_mut();
        state.input_layouts.remove(&layout);
        state.commands.push(DeviceCmd::ReleaseInputLayout(layout));
    }
}
