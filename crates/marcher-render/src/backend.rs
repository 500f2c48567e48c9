//! Compute dispatch backend abstraction
//!
//! The raymarch pass never talks to a GPU API directly. It drives a
//! [`RaymarchBackend`], which owns programs, textures and buffers and
//! resolves the binding names in [`crate::names`].

use marcher_sdf::PackedScene;
use thiserror::Error;

use crate::uniforms::ShaderParam;

/// Errors reported by a compute backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("No suitable GPU adapter found: {0}")]
    Adapter(String),

    #[error("Failed to create device: {0}")]
    Device(String),

    #[error("Kernel compilation failed: {0}")]
    Shader(String),

    #[error("Unknown compute program")]
    UnknownProgram,

    #[error("Texture format {0:?} cannot be used for random-write output")]
    UnsupportedFormat(wgpu::TextureFormat),

    #[error("Invalid target size {width}x{height} (limit {limit})")]
    InvalidTargetSize { width: u32, height: u32, limit: u32 },

    #[error("Nothing bound to {0}")]
    MissingBinding(&'static str),

    #[error("Cannot copy {from:?} into {to:?}")]
    CopyMismatch {
        from: (u32, u32, wgpu::TextureFormat),
        to: (u32, u32, wgpu::TextureFormat),
    },

    #[error("Scene buffer allocation failed: {0}")]
    Allocation(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("GPU readback failed: {0}")]
    Readback(String),
}

/// Shape of a render target the pass asks the backend for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    /// Whether the kernel writes to the texture from a compute dispatch
    pub random_write: bool,
}

impl TargetDescriptor {
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            random_write: false,
        }
    }

    /// Same target with random-write (storage) access enabled
    pub fn with_random_write(mut self) -> Self {
        self.random_write = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Texture usages a backend needs to allocate this target
    pub fn usage(&self) -> wgpu::TextureUsages {
        let usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        if self.random_write {
            usage | wgpu::TextureUsages::STORAGE_BINDING
        } else {
            usage
        }
    }
}

/// Operations the raymarch pass needs from a compute API.
///
/// Release calls take their handle by value, so a handle cannot be released
/// twice and there is no null handle to release.
pub trait RaymarchBackend {
    /// Compiled kernel
    type Program;
    /// Texture handle; cloning yields another handle to the same texture
    type Texture: Clone;
    /// Scene buffer handle
    type Buffer;

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<Self::Texture, BackendError>;

    fn release_target(&mut self, target: Self::Texture);

    /// Upload packed records into a new read-only buffer
    fn create_scene_buffer(&mut self, scene: &PackedScene) -> Result<Self::Buffer, BackendError>;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Set a scalar, vector or matrix parameter by binding name
    fn set_param(&mut self, program: &Self::Program, name: &str, value: ShaderParam);

    fn set_texture(&mut self, program: &Self::Program, name: &str, texture: &Self::Texture);

    fn set_buffer(&mut self, program: &Self::Program, name: &str, buffer: &Self::Buffer);

    /// Queue the kernel over `groups` thread groups without waiting for it
    fn dispatch(&mut self, program: &Self::Program, groups: [u32; 3]) -> Result<(), BackendError>;

    /// Copy one texture over another of the same size
    fn blit(&mut self, from: &Self::Texture, to: &Self::Texture) -> Result<(), BackendError>;
}
