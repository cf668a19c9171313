#![allow(dead_code)]

use bindery::{Diagnostics, RecordingDevice, ShaderProgram, StageConfig};
use bindery_dxbc::test_utils::{BlobBuilder, SigParam, TypeDesc, VarDesc};
use bindery_dxbc::{FourCC, ShaderStage};

// Raw D3D_SHADER_INPUT_TYPE values.
pub const SIT_TBUFFER: u32 = 1;
pub const SIT_TEXTURE: u32 = 2;
pub const SIT_SAMPLER: u32 = 3;
pub const SIT_UAV_RWTYPED: u32 = 4;
pub const SIT_STRUCTURED: u32 = 5;
pub const SIT_UAV_RWSTRUCTURED: u32 = 6;
pub const SIT_UAV_APPEND_STRUCTURED: u32 = 9;

/// `D3D_NAME_VERTEX_ID`.
pub const SV_VERTEX_ID: u32 = 6;

/// A pixel shader with two constant buffers, a tbuffer, a texture, a structured buffer
/// and a sampler.
///
/// `PerFrame` (slot 0, 96 bytes): `view` float4x4 at 0, `time` at 64, `tint` float4 at 80.
/// `Material` (slot 1, 16 bytes): `gloss` at 0, `layer` at 4.
/// `Lights` is a tbuffer at t5 and is never bound as a constant buffer.
pub fn pixel_blob() -> Vec<u8> {
    BlobBuilder::new(ShaderStage::Pixel)
        .rdef(|r| {
            r.cbuffer(
                "PerFrame",
                0,
                96,
                vec![
                    VarDesc::new("view", 0, 64).with_type(TypeDesc::float4x4()),
                    VarDesc::new("time", 64, 4).with_type(TypeDesc::float(1)),
                    VarDesc::new("tint", 80, 16).with_type(TypeDesc::float(4)),
                ],
            )
            .cbuffer(
                "Material",
                1,
                16,
                vec![VarDesc::new("gloss", 0, 4), VarDesc::new("layer", 4, 4)],
            )
            .binding("Lights", SIT_TBUFFER, 5)
            .cbuffer_without_binding("Lights", 32, 1, vec![VarDesc::new("light_count", 0, 4)])
            .binding("albedo", SIT_TEXTURE, 3)
            .binding("instances", SIT_STRUCTURED, 4)
            .binding("linear", SIT_SAMPLER, 2)
        })
        .signature(
            FourCC::ISGN,
            vec![
                SigParam::float("SV_Position", 0, 0, 0xF).with_system_value(1),
                SigParam::float("TEXCOORD", 0, 1, 0x3),
            ],
        )
        .build()
}

/// A vertex shader reading a position, a UV and a per-instance offset, plus `SV_VertexID`.
pub fn vertex_blob() -> Vec<u8> {
    BlobBuilder::new(ShaderStage::Vertex)
        .rdef(|r| r.cbuffer("Camera", 0, 64, vec![VarDesc::new("view_proj", 0, 64)]))
        .signature(
            FourCC::ISGN,
            vec![
                SigParam::float("POSITION", 0, 0, 0x7),
                SigParam::float("TEXCOORD", 0, 1, 0x3),
                SigParam::float("OFFSET_PER_INSTANCE", 0, 2, 0xF),
                SigParam::float("SV_VertexID", 0, 3, 0x1)
                    .with_component_type(1)
                    .with_system_value(SV_VERTEX_ID),
            ],
        )
        .build()
}

/// A geometry shader whose output signature spans two streams (`OSG5` layout).
///
/// Stride is `(4 + 2 + 3) * 4 = 36` bytes.
pub fn geometry_blob() -> Vec<u8> {
    BlobBuilder::new(ShaderStage::Geometry)
        .rdef(|r| r.cbuffer("Params", 0, 16, vec![VarDesc::new("scale", 0, 4)]))
        .signature(
            FourCC::OSG5,
            vec![
                SigParam::float("SV_Position", 0, 0, 0xF).with_system_value(1),
                SigParam::float("TEXCOORD", 0, 1, 0x3),
                SigParam::float("NORMAL", 0, 2, 0x7).with_stream(1),
            ],
        )
        .build()
}

/// A compute shader with `[numthreads(x, y, z)]` and three UAVs.
pub fn compute_blob(x: u32, y: u32, z: u32) -> Vec<u8> {
    BlobBuilder::new(ShaderStage::Compute)
        .rdef(|r| {
            r.cbuffer("Dispatch", 0, 16, vec![VarDesc::new("count", 0, 4)])
                .binding("input", SIT_STRUCTURED, 0)
                .binding("output", SIT_UAV_RWSTRUCTURED, 1)
                .binding("image", SIT_UAV_RWTYPED, 0)
                .binding("queue", SIT_UAV_APPEND_STRUCTURED, 2)
        })
        .thread_group(x, y, z)
        .build()
}

pub fn load(
    device: &RecordingDevice,
    config: StageConfig,
    bytes: &[u8],
) -> ShaderProgram<RecordingDevice> {
    let program = ShaderProgram::from_bytes(device.clone(), config, Diagnostics::VERBOSE, bytes);
    assert!(program.is_valid(), "fixture failed to load");
    program
}

/// Routes `tracing` output to the test harness so diagnostics show up on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
