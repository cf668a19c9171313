mod common;

use bindery::{DeviceCmd, RecordingDevice, StageConfig, UnorderedAccessViewId};
use pretty_assertions::assert_eq;

#[test]
fn thread_group_comes_from_the_declaration() {
    let device = RecordingDevice::new();
    let program = common::load(&device, StageConfig::Compute, &common::compute_blob(8, 8, 1));
    assert_eq!(program.thread_group_size(), [8, 8, 1]);
    assert_eq!(program.threads_per_group(), 64);
    assert_eq!(
        program.description().and_then(|d| d.thread_group_size),
        Some([8, 8, 1])
    );
}

#[test]
fn dispatch_by_threads_rounds_up_per_axis() {
    let device = RecordingDevice::new();
    for (group, threads) in [([5, 2, 2], [10, 3, 3]), ([3, 1, 1], [5, 2, 2])] {
        let program = common::load(
            &device,
            StageConfig::Compute,
            &common::compute_blob(group[0], group[1], group[2]),
        );
        device.take_commands();

        assert!(program.dispatch_by_threads(threads[0], threads[1], threads[2]));
        assert_eq!(
            device.take_commands(),
            vec![DeviceCmd::Dispatch { x: 2, y: 2, z: 2 }]
        );
    }
}

#[test]
fn dispatch_by_groups_is_exact() {
    let device = RecordingDevice::new();
    let program = common::load(&device, StageConfig::Compute, &common::compute_blob(64, 1, 1));
    device.take_commands();

    assert!(program.dispatch_by_groups(3, 0, 7));
    assert!(program.dispatch_by_threads(0, 0, 0));
    assert_eq!(
        device.take_commands(),
        vec![
            DeviceCmd::Dispatch { x: 3, y: 0, z: 7 },
            DeviceCmd::Dispatch { x: 1, y: 1, z: 1 },
        ]
    );
}

#[test]
fn unordered_access_views_bind_by_name() {
    let device = RecordingDevice::new();
    let program = common::load(&device, StageConfig::Compute, &common::compute_blob(8, 8, 1));
    device.take_commands();

    assert!(program.has_unordered_access_view("output"));
    assert!(program.has_unordered_access_view("image"));
    assert!(program.has_unordered_access_view("queue"));
    assert!(!program.has_unordered_access_view("input"));
    assert!(program.has_resource("input"));
    assert_eq!(program.unordered_access_slot("queue"), Some(2));

    assert!(program.set_unordered_access_view("queue", Some(UnorderedAccessViewId(5)), 0));
    assert!(program.set_unordered_access_view("output", None, u32::MAX));
    assert!(!program.set_unordered_access_view("input", Some(UnorderedAccessViewId(6)), 0));
    assert_eq!(
        device.take_commands(),
        vec![
            DeviceCmd::SetUnorderedAccessView {
                slot: 2,
                view: Some(UnorderedAccessViewId(5)),
                initial_count: 0,
            },
            DeviceCmd::SetUnorderedAccessView {
                slot: 1,
                view: None,
                initial_count: u32::MAX,
            },
        ]
    );
}

#[test]
fn dispatch_requires_a_compute_program() {
    let device = RecordingDevice::new();
    let program = common::load(&device, StageConfig::Pixel, &common::pixel_blob());
    device.take_commands();

    assert!(!program.dispatch_by_groups(1, 1, 1));
    assert!(!program.dispatch_by_threads(64, 1, 1));
    assert_eq!(program.thread_group_size(), [0; 3]);
    assert!(device.commands().is_empty());
}

#[test]
fn compute_without_thread_group_dispatches_one_group_per_axis() {
    use bindery_dxbc::test_utils::BlobBuilder;

    let blob = BlobBuilder::new(bindery_dxbc::ShaderStage::Compute).build();
    let device = RecordingDevice::new();
    let program = common::load(&device, StageConfig::Compute, &blob);
    device.take_commands();

    assert_eq!(program.threads_per_group(), 0);
    assert!(program.dispatch_by_threads(100, 10, 1));
    assert_eq!(
        device.take_commands(),
        vec![DeviceCmd::Dispatch { x: 1, y: 1, z: 1 }]
    );
}
