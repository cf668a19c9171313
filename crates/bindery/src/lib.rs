//! Name-addressable shader bindings for compiled Direct3D 10/11 shaders.
//!
//! A [`ShaderProgram`] reflects a `DXBC` binary (through [`bindery_dxbc`]), creates the
//! shader and one GPU buffer per constant buffer, and lets callers stage values by
//! variable name before uploading and binding them:
//!
//! ```ignore
//! let diagnostics = Diagnostics::from_env();
//! let mut program =
//!     ShaderProgram::from_path(&device, StageConfig::Pixel, diagnostics, "lit.ps.dxbc");
//! program.set_float4("tint", [1.0, 0.5, 0.25, 1.0]);
//! program.upload_all();
//! program.activate();
//! program.set_resource("albedo", Some(albedo_view));
//! ```
//!
//! All GPU work goes through the [`GpuDevice`] trait. [`RecordingDevice`] implements it
//! in memory for tests and tooling.

mod compute;
mod device;
mod diagnostics;
mod error;
mod input_layout;
mod program;
mod recording;
mod stage;
mod stream_out;
mod tables;

pub use crate::compute::{groups_for_thread_counts, groups_for_threads};
pub use crate::device::{
    BindFlags, BufferDesc, BufferId, DeviceError, GpuDevice, InputLayoutId, SamplerId,
    ShaderId, ShaderResourceViewId, StreamOutputDesc, UnorderedAccessViewId,
    STREAM_OUTPUT_SLOTS,
};
pub use crate::diagnostics::Diagnostics;
pub use crate::error::{Severity, ShaderError};
pub use crate::input_layout::{
    resolve_offsets, synthesize_elements, Format, InputClassification, InputElementDesc,
    InputLayout, APPEND_ALIGNED_ELEMENT, PER_INSTANCE_SUFFIX,
};
pub use crate::program::ShaderProgram;
pub use crate::recording::{DeviceCmd, FailOn, RecordingDevice};
pub use crate::stage::{ShaderStage, StageConfig};
pub use crate::stream_out::{stream_out_declaration, StreamOutEntry, StreamOutOptions};
pub use crate::tables::{
    ConstantBuffer, Key, SamplerSlot, ShaderResource, ShaderVariable, UnorderedAccessSlot,
};
