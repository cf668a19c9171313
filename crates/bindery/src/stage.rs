//! Per-stage behavior of a [`ShaderProgram`](crate::ShaderProgram).
//!
//! A program picks its [`StageOps`] from the [`StageConfig`] it was constructed with. The
//! table holds the two stage-specific steps: creating the GPU shader object, and binding
//! it (plus anything stage-specific like the input layout) on activation. Everything else
//! is shared. State that only one stage carries lives in [`StageExt`].

use core::fmt;

use bindery_dxbc::ShaderDescription;
use tracing::debug;

use crate::compute::{self, ComputeExt};
use crate::device::{GpuDevice, InputLayoutId, ShaderId};
use crate::diagnostics::Diagnostics;
use crate::error::ShaderError;
use crate::input_layout::{self, InputLayout, VertexExt};
use crate::stream_out::{self, GeometryExt, StreamOutOptions};

/// The six programmable pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Hull,
    Domain,
    Geometry,
    Compute,
}

impl ShaderStage {
    /// Returns `true` if a reflected stage tag belongs to this stage.
    pub fn matches(self, reflected: bindery_dxbc::ShaderStage) -> bool {
        use bindery_dxbc::ShaderStage as R;
        matches!(
            (self, reflected),
            (Self::Vertex, R::Vertex)
                | (Self::Pixel, R::Pixel)
                | (Self::Hull, R::Hull)
                | (Self::Domain, R::Domain)
                | (Self::Geometry, R::Geometry)
                | (Self::Compute, R::Compute)
        )
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vertex => "vertex",
            Self::Pixel => "pixel",
            Self::Hull => "hull",
            Self::Domain => "domain",
            Self::Geometry => "geometry",
            Self::Compute => "compute",
        };
        f.write_str(s)
    }
}

/// Stage selection plus the per-stage options fixed at construction.
#[derive(Debug, Clone, Default)]
pub enum StageConfig {
    /// Vertex shader. With `input_layout: None` a layout is synthesized from the input
    /// signature the first time a binary loads.
    Vertex { input_layout: Option<InputLayout> },
    #[default]
    Pixel,
    Hull,
    Domain,
    /// Geometry shader, optionally writing to stream output.
    Geometry { stream_out: Option<StreamOutOptions> },
    Compute,
}

impl StageConfig {
    /// A vertex stage that synthesizes its own input layout.
    pub fn vertex() -> Self {
        Self::Vertex { input_layout: None }
    }

    /// A geometry stage without stream output.
    pub fn geometry() -> Self {
        Self::Geometry { stream_out: None }
    }

    /// Returns the stage this config selects.
    pub fn stage(&self) -> ShaderStage {
        match self {
            Self::Vertex { .. } => ShaderStage::Vertex,
            Self::Pixel => ShaderStage::Pixel,
            Self::Hull => ShaderStage::Hull,
            Self::Domain => ShaderStage::Domain,
            Self::Geometry { .. } => ShaderStage::Geometry,
            Self::Compute => ShaderStage::Compute,
        }
    }
}

/// Stage-specific state.
#[derive(Debug, Clone)]
pub(crate) enum StageExt {
    Vertex(VertexExt),
    Geometry(GeometryExt),
    Compute(ComputeExt),
    None,
}

impl StageExt {
    pub(crate) fn from_config(config: StageConfig) -> Self {
        match config {
            StageConfig::Vertex { input_layout } => Self::Vertex(VertexExt::new(input_layout)),
            StageConfig::Geometry { stream_out } => Self::Geometry(GeometryExt::new(stream_out)),
            StageConfig::Compute => Self::Compute(ComputeExt::default()),
            StageConfig::Pixel | StageConfig::Hull | StageConfig::Domain => Self::None,
        }
    }

    /// Clears whatever was derived from the previous binary; construction options stay.
    /// Returns a synthesized input layout that the caller must release.
    pub(crate) fn reset(&mut self) -> Option<InputLayoutId> {
        match self {
            Self::Vertex(ext) => ext.reset(),
            Self::Geometry(ext) => {
                ext.reset();
                None
            }
            Self::Compute(ext) => {
                *ext = ComputeExt::default();
                None
            }
            Self::None => None,
        }
    }
}

pub(crate) type CreateFn<D> = fn(
    &D,
    ShaderStage,
    &mut StageExt,
    &[u8],
    &ShaderDescription,
    &Diagnostics,
) -> Result<ShaderId, ShaderError>;
pub(crate) type ActivateFn<D> = fn(&D, ShaderStage, &StageExt, ShaderId);

/// The stage-specific half of a program.
pub(crate) struct StageOps<D: GpuDevice> {
    pub(crate) stage: ShaderStage,
    pub(crate) create: CreateFn<D>,
    pub(crate) activate: ActivateFn<D>,
}

// Manual impls: the derives would require `D: Clone + Copy`.
impl<D: GpuDevice> Clone for StageOps<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: GpuDevice> Copy for StageOps<D> {}

impl<D: GpuDevice> fmt::Debug for StageOps<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageOps").field("stage", &self.stage).finish()
    }
}

impl<D: GpuDevice> StageOps<D> {
    pub(crate) fn for_stage(stage: ShaderStage) -> Self {
        let (create, activate): (CreateFn<D>, ActivateFn<D>) = match stage {
            ShaderStage::Vertex => (
                input_layout::create_vertex::<D>,
                input_layout::activate_vertex::<D>,
            ),
            ShaderStage::Geometry => (stream_out::create_geometry::<D>, activate_plain::<D>),
            ShaderStage::Compute => (compute::create_compute::<D>, activate_plain::<D>),
            ShaderStage::Pixel | ShaderStage::Hull | ShaderStage::Domain => {
                (create_plain::<D>, activate_plain::<D>)
            }
        };
        Self {
            stage,
            create,
            activate,
        }
    }

    pub(crate) fn create(
        &self,
        device: &D,
        ext: &mut StageExt,
        bytecode: &[u8],
        desc: &ShaderDescription,
        diagnostics: &Diagnostics,
    ) -> Result<ShaderId, ShaderError> {
        (self.create)(device, self.stage, ext, bytecode, desc, diagnostics)
    }

    pub(crate) fn activate(&self, device: &D, ext: &StageExt, shader: ShaderId) {
        (self.activate)(device, self.stage, ext, shader)
    }
}

pub(crate) fn create_plain<D: GpuDevice>(
    device: &D,
    stage: ShaderStage,
    _ext: &mut StageExt,
    bytecode: &[u8],
    _desc: &ShaderDescription,
    _diagnostics: &Diagnostics,
) -> Result<ShaderId, ShaderError> {
    let shader = device
        .create_shader(stage, bytecode)
        .map_err(|source| ShaderError::Create {
            what: "shader",
            source,
        })?;
    debug!(%stage, shader = shader.0, "created shader");
    Ok(shader)
}

pub(crate) fn activate_plain<D: GpuDevice>(
    device: &D,
    stage: ShaderStage,
    _ext: &StageExt,
    shader: ShaderId,
) {
    device.set_shader(stage, Some(shader));
}
