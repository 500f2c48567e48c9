//! Per-object shading parameters

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Surface description of a single SDF node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Base color (RGB, 0-1)
    pub color: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            roughness: 1.0,
            metalness: 0.0,
        }
    }
}

impl Material {
    pub fn new(color: [f32; 3], roughness: f32, metalness: f32) -> Self {
        Self {
            color,
            roughness,
            metalness,
        }
    }

    pub fn color(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: [r, g, b],
            ..Default::default()
        }
    }
}

/// GPU-ready material, 8 floats.
/// This struct must match the WGSL `SdfMaterial` layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PackedMaterial {
    pub color: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
    pub _pad0: [f32; 3],
}

pub const PACKED_MATERIAL_SIZE: usize = 32;

const _: () = assert!(std::mem::size_of::<PackedMaterial>() == PACKED_MATERIAL_SIZE);
const _: () = assert!(PACKED_MATERIAL_SIZE % 16 == 0);

impl From<&Material> for PackedMaterial {
    fn from(material: &Material) -> Self {
        Self {
            color: material.color,
            roughness: material.roughness,
            metalness: material.metalness,
            _pad0: [0.0; 3],
        }
    }
}

impl Default for PackedMaterial {
    fn default() -> Self {
        PackedMaterial::from(&Material::default())
    }
}
