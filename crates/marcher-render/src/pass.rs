//! Per-frame raymarch dispatch
//!
//! Each frame runs Setup, Upload, Dispatch, Composite and Cleanup in order.
//! A frame either renders completely or is skipped; no error escapes it.

use glam::Vec4;
use marcher_sdf::{SdfNode, pack};
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::backend::{BackendError, RaymarchBackend, TargetDescriptor};
use crate::camera::CameraData;
use crate::lifecycle::BufferLedger;
use crate::names;
use crate::settings::{PassEvent, RaymarchSettings};
use crate::uniforms::FrameUniforms;

/// Edge length of a kernel thread group (8x8x1)
pub const THREAD_GROUP_SIZE: u32 = 8;

/// Thread groups covering a `width` x `height` target
pub fn thread_groups(width: u32, height: u32) -> [u32; 3] {
    [
        width.div_ceil(THREAD_GROUP_SIZE),
        height.div_ceil(THREAD_GROUP_SIZE),
        1,
    ]
}

/// What the host supplies for one frame
#[derive(Debug)]
pub struct FrameInputs<'a, T> {
    /// Its pixel size sets the dispatch size
    pub camera: CameraData,
    /// Shape of the temporary output target, sized like the camera viewport
    pub target: TargetDescriptor,
    /// Current color buffer
    pub color_source: &'a T,
    pub depth: &'a T,
    /// Depth reconstruction parameters, see [`crate::Camera::z_buffer_params`]
    pub z_buffer_params: Vec4,
}

/// Composited color and how the frame went
#[derive(Debug)]
pub struct FrameOutput<T> {
    pub color: T,
    pub status: FrameStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    Rendered { objects: u32, thread_groups: [u32; 3] },
    Skipped(SkipReason),
}

impl FrameStatus {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Why a frame produced no raymarched output
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("No compute program assigned")]
    MissingProgram,

    #[error("Viewport has zero area")]
    EmptyViewport,

    #[error("Camera viewport {camera:?} does not match target size {target:?}")]
    ViewportMismatch { camera: [u32; 2], target: [u32; 2] },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Program and composite target fixed for the duration of one frame
struct ResolvedPass<'a, B: RaymarchBackend> {
    program: &'a B::Program,
    composite_target: &'a B::Texture,
}

impl<'a, B: RaymarchBackend> ResolvedPass<'a, B> {
    /// The composite target is the explicit one if set, else the frame's color source
    fn resolve(
        program: Option<&'a B::Program>,
        explicit_target: Option<&'a B::Texture>,
        color_source: &'a B::Texture,
    ) -> Result<Self, SkipReason> {
        let program = program.ok_or(SkipReason::MissingProgram)?;
        Ok(Self {
            program,
            composite_target: explicit_target.unwrap_or(color_source),
        })
    }
}

/// Raymarch pass driven once per frame by the host
pub struct RaymarchPass<B: RaymarchBackend> {
    settings: RaymarchSettings,
    program: Option<B::Program>,
    composite_target: Option<B::Texture>,
    buffers: BufferLedger<B::Buffer>,
    frame_index: u64,
}

impl<B: RaymarchBackend> RaymarchPass<B> {
    pub fn new(settings: RaymarchSettings) -> Self {
        Self {
            settings,
            program: None,
            composite_target: None,
            buffers: BufferLedger::new(),
            frame_index: 0,
        }
    }

    pub fn with_program(mut self, program: B::Program) -> Self {
        self.program = Some(program);
        self
    }

    /// Composite into `target` instead of the frame's color source
    pub fn with_composite_target(mut self, target: B::Texture) -> Self {
        self.composite_target = Some(target);
        self
    }

    pub fn set_program(&mut self, program: Option<B::Program>) {
        self.program = program;
    }

    pub fn settings(&self) -> &RaymarchSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RaymarchSettings {
        &mut self.settings
    }

    /// Where the host should schedule this pass
    pub fn insert_at(&self) -> PassEvent {
        self.settings.insert_at
    }

    /// Scene buffers still waiting for release
    pub fn live_buffers(&self) -> usize {
        self.buffers.live()
    }

    /// Frames run so far, skipped ones included
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Run one frame over `nodes`, which must already be in draw order.
    ///
    /// Returns the composite target on success and the unmodified color
    /// source when the frame is skipped.
    pub fn render_frame(
        &mut self,
        backend: &mut B,
        frame: &FrameInputs<'_, B::Texture>,
        nodes: &[SdfNode],
    ) -> FrameOutput<B::Texture> {
        self.frame_index += 1;

        // Setup: the previous generation goes before anything else is allocated
        for buffer in self.buffers.begin_frame() {
            backend.release_buffer(buffer);
            trace!(frame = self.frame_index, "Released scene buffer");
        }

        let resolved = match ResolvedPass::<B>::resolve(
            self.program.as_ref(),
            self.composite_target.as_ref(),
            frame.color_source,
        ) {
            Ok(resolved) => resolved,
            Err(reason) => return skip(self.frame_index, frame, reason),
        };

        if let Err(reason) = check_viewport(frame) {
            return skip(self.frame_index, frame, reason);
        }

        match run_frame(
            backend,
            &mut self.buffers,
            &self.settings,
            &resolved,
            frame,
            nodes,
        ) {
            Ok(status) => {
                debug!(frame = self.frame_index, ?status, "Raymarch frame complete");
                FrameOutput {
                    color: resolved.composite_target.clone(),
                    status,
                }
            }
            Err(reason) => skip(self.frame_index, frame, reason),
        }
    }

    /// Release every outstanding scene buffer
    pub fn teardown(&mut self, backend: &mut B) {
        let buffers = self.buffers.drain();
        debug!(count = buffers.len(), "Tearing down raymarch pass");
        for buffer in buffers {
            backend.release_buffer(buffer);
        }
    }
}

fn skip<T: Clone>(frame_index: u64, frame: &FrameInputs<'_, T>, reason: SkipReason) -> FrameOutput<T> {
    error!(frame = frame_index, %reason, "Skipping raymarch frame");
    FrameOutput {
        color: frame.color_source.clone(),
        status: FrameStatus::Skipped(reason),
    }
}

/// The camera viewport must be non-empty and match the target it is rendered into
fn check_viewport<T>(frame: &FrameInputs<'_, T>) -> Result<(), SkipReason> {
    let camera = [frame.camera.pixel_width, frame.camera.pixel_height];
    let target = [frame.target.width, frame.target.height];
    if camera.contains(&0) || frame.target.is_empty() {
        return Err(SkipReason::EmptyViewport);
    }
    if camera != target {
        return Err(SkipReason::ViewportMismatch { camera, target });
    }
    Ok(())
}

/// Allocate the temporary target, run the frame on it, then always release it
fn run_frame<B: RaymarchBackend>(
    backend: &mut B,
    buffers: &mut BufferLedger<B::Buffer>,
    settings: &RaymarchSettings,
    resolved: &ResolvedPass<'_, B>,
    frame: &FrameInputs<'_, B::Texture>,
    nodes: &[SdfNode],
) -> Result<FrameStatus, SkipReason> {
    let temp = backend.create_target(&frame.target.with_random_write())?;
    let result = upload_and_dispatch(backend, buffers, settings, resolved, frame, nodes, &temp);
    backend.release_target(temp);
    result
}

fn upload_and_dispatch<B: RaymarchBackend>(
    backend: &mut B,
    buffers: &mut BufferLedger<B::Buffer>,
    settings: &RaymarchSettings,
    resolved: &ResolvedPass<'_, B>,
    frame: &FrameInputs<'_, B::Texture>,
    nodes: &[SdfNode],
    temp: &B::Texture,
) -> Result<FrameStatus, SkipReason> {
    let program = resolved.program;
    let scene = pack(nodes);
    let objects = u32::try_from(scene.count())
        .map_err(|_| BackendError::Allocation(format!("{} records", scene.count())))?;

    let uniforms = FrameUniforms::new(settings, &frame.camera, frame.z_buffer_params, objects);
    for (name, value) in uniforms.params() {
        backend.set_param(program, name, value);
    }

    backend.set_texture(program, names::SOURCE, resolved.composite_target);
    backend.set_texture(program, names::DESTINATION, temp);
    backend.set_texture(program, names::DEPTH_TEXTURE, frame.depth);

    let buffer = backend.create_scene_buffer(&scene)?;
    backend.set_buffer(program, names::VOLUMES, &buffer);
    buffers.track(buffer);

    let groups = thread_groups(frame.camera.pixel_width, frame.camera.pixel_height);
    backend.dispatch(program, groups)?;
    backend.blit(temp, resolved.composite_target)?;

    Ok(FrameStatus::Rendered {
        objects,
        thread_groups: groups,
    })
}
