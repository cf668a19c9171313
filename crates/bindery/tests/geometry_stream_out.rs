mod common;

use bindery::{
    BindFlags, BufferDesc, DeviceCmd, RecordingDevice, StageConfig, StreamOutEntry,
    StreamOutOptions,
};
use pretty_assertions::assert_eq;

fn stream_out(rasterize_stream: bool) -> StageConfig {
    StageConfig::Geometry {
        stream_out: Some(StreamOutOptions { rasterize_stream }),
    }
}

#[test]
fn declaration_covers_the_output_signature() {
    let device = RecordingDevice::new();
    let program = common::load(&device, stream_out(true), &common::geometry_blob());

    assert_eq!(program.stream_out_stride(), 36);
    let entry = |stream, name: &str, component_count| StreamOutEntry {
        stream,
        semantic_name: name.to_owned(),
        semantic_index: 0,
        start_component: 0,
        component_count,
        output_slot: 0,
    };
    let expected = vec![
        entry(0, "SV_Position", 4),
        entry(0, "TEXCOORD", 2),
        entry(1, "NORMAL", 3),
    ];
    assert_eq!(program.stream_out_declaration(), expected.as_slice());

    let created = device
        .commands()
        .into_iter()
        .find_map(|cmd| match cmd {
            DeviceCmd::CreateGeometryShaderWithStreamOutput {
                declaration,
                buffer_strides,
                rasterized_stream,
                ..
            } => Some((declaration, buffer_strides, rasterized_stream)),
            _ => None,
        })
        .unwrap();
    assert_eq!(created, (expected, vec![36], Some(0)));
}

#[test]
fn disabled_rasterization_passes_no_stream() {
    let device = RecordingDevice::new();
    let _program = common::load(&device, stream_out(false), &common::geometry_blob());
    assert!(device.commands().iter().any(|cmd| matches!(
        cmd,
        DeviceCmd::CreateGeometryShaderWithStreamOutput {
            rasterized_stream: None,
            ..
        }
    )));
}

#[test]
fn compatible_buffer_is_stride_times_vertex_count() {
    let device = RecordingDevice::new();
    let program = common::load(&device, stream_out(true), &common::geometry_blob());
    device.take_commands();

    let buffer = program.create_compatible_stream_out_buffer(100).unwrap();
    assert_eq!(
        device.take_commands(),
        vec![DeviceCmd::CreateBuffer {
            buffer,
            desc: BufferDesc {
                byte_width: 3600,
                bind_flags: BindFlags::STREAM_OUTPUT | BindFlags::VERTEX_BUFFER,
            },
        }]
    );

    // The caller owns the buffer; dropping the program leaves it alive.
    drop(program);
    assert_eq!(device.buffer_contents(buffer).map(|b| b.len()), Some(3600));
}

#[test]
fn plain_geometry_program_refuses_stream_out_buffers() {
    let device = RecordingDevice::new();
    let program = common::load(&device, StageConfig::geometry(), &common::geometry_blob());
    assert!(device
        .commands()
        .iter()
        .any(|cmd| matches!(cmd, DeviceCmd::CreateShader { .. })));
    assert_eq!(program.stream_out_stride(), 0);
    assert!(program.stream_out_declaration().is_empty());

    device.take_commands();
    assert_eq!(program.create_compatible_stream_out_buffer(16), None);
    assert!(device.commands().is_empty());
}

#[test]
fn non_geometry_program_refuses_stream_out_buffers() {
    let device = RecordingDevice::new();
    let program = common::load(&device, StageConfig::Pixel, &common::pixel_blob());
    device.take_commands();

    assert_eq!(program.create_compatible_stream_out_buffer(16), None);
    program.unbind_stream_out_stage();
    assert!(device.commands().is_empty());
}

#[test]
fn unbind_clears_all_four_targets() {
    let device = RecordingDevice::new();
    let program = common::load(&device, stream_out(true), &common::geometry_blob());
    device.take_commands();

    program.unbind_stream_out_stage();
    assert_eq!(
        device.take_commands(),
        vec![DeviceCmd::SetStreamOutputTargets {
            targets: [None; 4],
            offsets: [0; 4],
        }]
    );
}
