//! Compute stage: thread-group bookkeeping and dispatch sizing.

use bindery_dxbc::ShaderDescription;
use tracing::debug;

use crate::device::{GpuDevice, ShaderId};
use crate::diagnostics::Diagnostics;
use crate::error::ShaderError;
use crate::stage::{self, ShaderStage, StageExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ComputeExt {
    pub(crate) thread_group: [u32; 3],
}

impl ComputeExt {
    pub(crate) fn threads_per_group(&self) -> u64 {
        self.thread_group.iter().map(|&d| u64::from(d)).product()
    }
}

/// Number of groups needed to cover `threads` along one axis.
///
/// Always at least one; a zero group size also yields one group.
pub fn groups_for_threads(threads: u32, group_size: u32) -> u32 {
    if group_size == 0 {
        return 1;
    }
    threads.div_ceil(group_size).max(1)
}

/// Per-axis [`groups_for_threads`].
pub fn groups_for_thread_counts(threads: [u32; 3], group_size: [u32; 3]) -> [u32; 3] {
    [
        groups_for_threads(threads[0], group_size[0]),
        groups_for_threads(threads[1], group_size[1]),
        groups_for_threads(threads[2], group_size[2]),
    ]
}

pub(crate) fn create_compute<D: GpuDevice>(
    device: &D,
    stage: ShaderStage,
    ext: &mut StageExt,
    bytecode: &[u8],
    desc: &ShaderDescription,
    diagnostics: &Diagnostics,
) -> Result<ShaderId, ShaderError> {
    let shader = stage::create_plain(device, stage, ext, bytecode, desc, diagnostics)?;
    if let StageExt::Compute(compute) = ext {
        compute.thread_group = desc.thread_group_size.unwrap_or_default();
        debug!(
            x = compute.thread_group[0],
            y = compute.thread_group[1],
            z = compute.thread_group[2],
            "compute thread group"
        );
    }
    Ok(shader)
}
