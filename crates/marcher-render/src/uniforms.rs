//! Frame uniform set and the kernel's binding interface

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use std::mem::{offset_of, size_of};

use crate::camera::CameraData;
use crate::names;
use crate::settings::RaymarchSettings;

/// A single named value handed to the compute backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderParam {
    UInt(u32),
    Float(f32),
    Vector(Vec4),
    Matrix(Mat4),
}

/// GPU-ready frame uniforms, rebuilt from scratch every frame.
/// This struct must match the WGSL `FrameUniforms` layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub camera_to_world: [[f32; 4]; 4],
    pub projection_to_camera: [[f32; 4]; 4],
    pub heatmap_color: [f32; 4],
    pub z_buffer_params: [f32; 4],
    pub color_mode: u32,
    pub max_iterations: u32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub shadow_bias: f32,
    pub object_count: u32,
    pub _pad0: [u32; 2],
}

const _: () = assert!(size_of::<FrameUniforms>() == 192);
const _: () = assert!(size_of::<FrameUniforms>() % 16 == 0);
const _: () = assert!(offset_of!(FrameUniforms, heatmap_color) == 128);
const _: () = assert!(offset_of!(FrameUniforms, color_mode) == 160);
const _: () = assert!(offset_of!(FrameUniforms, object_count) == 180);

impl FrameUniforms {
    pub fn new(
        settings: &RaymarchSettings,
        camera: &CameraData,
        z_buffer_params: Vec4,
        object_count: u32,
    ) -> Self {
        Self {
            camera_to_world: camera.camera_to_world.to_cols_array_2d(),
            projection_to_camera: camera.projection.inverse().to_cols_array_2d(),
            heatmap_color: settings.heatmap_color,
            z_buffer_params: z_buffer_params.to_array(),
            color_mode: settings.color_mode.tag(),
            max_iterations: settings.max_iterations,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            shadow_bias: settings.shadow_bias,
            object_count,
            _pad0: [0; 2],
        }
    }

    /// Every uniform with its binding name, in [`names::UNIFORMS`] order
    pub fn params(&self) -> [(&'static str, ShaderParam); 10] {
        [
            (names::COLOR_MODE, ShaderParam::UInt(self.color_mode)),
            (
                names::HEATMAP_COLOR,
                ShaderParam::Vector(Vec4::from_array(self.heatmap_color)),
            ),
            (
                names::CAMERA_TO_WORLD,
                ShaderParam::Matrix(Mat4::from_cols_array_2d(&self.camera_to_world)),
            ),
            (
                names::PROJECTION_TO_CAMERA,
                ShaderParam::Matrix(Mat4::from_cols_array_2d(&self.projection_to_camera)),
            ),
            (names::MAX_ITERATIONS, ShaderParam::UInt(self.max_iterations)),
            (names::MIN_DISTANCE, ShaderParam::Float(self.min_distance)),
            (names::MAX_DISTANCE, ShaderParam::Float(self.max_distance)),
            (names::SHADOW_BIAS, ShaderParam::Float(self.shadow_bias)),
            (
                names::Z_BUFFER_PARAMS,
                ShaderParam::Vector(Vec4::from_array(self.z_buffer_params)),
            ),
            (names::VOLUME_COUNT, ShaderParam::UInt(self.object_count)),
        ]
    }

    /// Store a named parameter into its field.
    ///
    /// Returns `false` if the name is unknown or the value has the wrong type.
    pub fn apply(&mut self, name: &str, value: ShaderParam) -> bool {
        match (name, value) {
            (names::COLOR_MODE, ShaderParam::UInt(v)) => self.color_mode = v,
            (names::HEATMAP_COLOR, ShaderParam::Vector(v)) => self.heatmap_color = v.to_array(),
            (names::CAMERA_TO_WORLD, ShaderParam::Matrix(m)) => {
                self.camera_to_world = m.to_cols_array_2d();
            }
            (names::PROJECTION_TO_CAMERA, ShaderParam::Matrix(m)) => {
                self.projection_to_camera = m.to_cols_array_2d();
            }
            (names::MAX_ITERATIONS, ShaderParam::UInt(v)) => self.max_iterations = v,
            (names::MIN_DISTANCE, ShaderParam::Float(v)) => self.min_distance = v,
            (names::MAX_DISTANCE, ShaderParam::Float(v)) => self.max_distance = v,
            (names::SHADOW_BIAS, ShaderParam::Float(v)) => self.shadow_bias = v,
            (names::Z_BUFFER_PARAMS, ShaderParam::Vector(v)) => {
                self.z_buffer_params = v.to_array();
            }
            (names::VOLUME_COUNT, ShaderParam::UInt(v)) => self.object_count = v,
            _ => return false,
        }
        true
    }
}

/// WGSL mirror of [`FrameUniforms`]
pub const FRAME_UNIFORMS_WGSL: &str = r#"struct FrameUniforms {
    camera_to_world: mat4x4<f32>,
    projection_to_camera: mat4x4<f32>,
    heatmap_color: vec4<f32>,
    z_buffer_params: vec4<f32>,
    color_mode: u32,
    max_iterations: u32,
    min_distance: f32,
    max_distance: f32,
    shadow_bias: f32,
    object_count: u32,
    pad0: u32,
    pad1: u32,
}
"#;

/// Bind group slots of the kernel interface
pub mod slots {
    pub const UNIFORMS: u32 = 0;
    pub const SOURCE: u32 = 1;
    pub const DESTINATION: u32 = 2;
    pub const DEPTH_TEXTURE: u32 = 3;
    pub const VOLUMES: u32 = 4;
}

/// WGSL storage texel format name for an output format, if it can be bound
/// as a write-only storage texture without extra device features
pub fn storage_format_name(format: wgpu::TextureFormat) -> Option<&'static str> {
    use wgpu::TextureFormat as F;
    match format {
        F::Rgba8Unorm => Some("rgba8unorm"),
        F::Rgba8Snorm => Some("rgba8snorm"),
        F::Rgba16Float => Some("rgba16float"),
        F::Rgba32Float => Some("rgba32float"),
        _ => None,
    }
}

/// Declarations every kernel is compiled with: record and uniform structs,
/// tag constants and the bind group.
///
/// The kernel source only supplies functions and its `@compute` entry point.
pub fn kernel_interface(output_format: wgpu::TextureFormat) -> Option<String> {
    let storage = storage_format_name(output_format)?;
    let bindings = format!(
        "@group(0) @binding({uniforms}) var<uniform> frame: FrameUniforms;
@group(0) @binding({source}) var {source_name}: texture_2d<f32>;
@group(0) @binding({destination}) var {destination_name}: texture_storage_2d<{storage}, write>;
@group(0) @binding({depth}) var {depth_name}: texture_depth_2d;
@group(0) @binding({volumes}) var<storage, read> {volumes_name}: array<SdfData>;
",
        uniforms = slots::UNIFORMS,
        source = slots::SOURCE,
        source_name = names::SOURCE,
        destination = slots::DESTINATION,
        destination_name = names::DESTINATION,
        depth = slots::DEPTH_TEXTURE,
        depth_name = names::DEPTH_TEXTURE,
        volumes = slots::VOLUMES,
        volumes_name = names::VOLUMES,
    );

    Some(format!(
        "{}\n{}\n{}",
        marcher_sdf::wgsl::record_declarations(),
        FRAME_UNIFORMS_WGSL,
        bindings
    ))
}
