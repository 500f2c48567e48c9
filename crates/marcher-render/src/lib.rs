//! Marcher Render - Per-frame raymarch compute pass
//!
//! This crate drives a GPU raymarch kernel once per frame: it packs the
//! frame's SDF nodes, binds them together with the frame uniforms and the
//! host's color and depth textures, dispatches the kernel over the viewport
//! and composites the result back over the color buffer.
//!
//! ## Features
//!
//! - Backend-agnostic orchestration through [`RaymarchBackend`]
//! - A wgpu backend with headless initialization and texture readback
//! - Release-on-next-frame lifecycle for scene buffers
//! - Fixed binding names shared with the kernel ([`names`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use marcher_render::{RaymarchPass, RaymarchSettings, WgpuBackend, init_headless};
//!
//! let (device, queue) = pollster::block_on(init_headless())?;
//! let mut backend = WgpuBackend::new(device, queue);
//! let program = backend.load_program(kernel, "main", wgpu::TextureFormat::Rgba8Unorm)?;
//! let mut pass = RaymarchPass::new(RaymarchSettings::default()).with_program(program);
//!
//! let output = pass.render_frame(&mut backend, &frame, &scene.snapshot());
//! ```

pub mod backend;
pub mod camera;
pub mod lifecycle;
pub mod names;
pub mod pass;
pub mod settings;
pub mod uniforms;
pub mod wgpu_backend;

// Re-export wgpu for users who need texture formats, etc.
pub use wgpu;

pub use backend::{BackendError, RaymarchBackend, TargetDescriptor};
pub use camera::{Camera, CameraData};
pub use lifecycle::BufferLedger;
pub use pass::{
    FrameInputs, FrameOutput, FrameStatus, RaymarchPass, SkipReason, THREAD_GROUP_SIZE,
    thread_groups,
};
pub use settings::{ColorMode, PassEvent, RaymarchSettings};
pub use uniforms::{FRAME_UNIFORMS_WGSL, FrameUniforms, ShaderParam, kernel_interface};
pub use wgpu_backend::{ProgramId, WgpuBackend, WgpuBuffer, WgpuTexture, init_headless};
