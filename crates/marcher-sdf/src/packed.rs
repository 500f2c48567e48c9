//! GPU-facing scene records
//!
//! [`PackedSdf`] is the projection of an [`SdfNode`] that the raymarch kernel
//! reads from its storage buffer. The layout is fixed: every field offset and
//! the total stride are checked at compile time, and the WGSL declaration in
//! [`crate::wgsl`] mirrors it field for field. A silent mismatch here renders
//! garbage without raising any error, so any change to this struct must be
//! made together with the WGSL side.

use bytemuck::{Pod, Zeroable};
use std::mem::{offset_of, size_of};

use crate::material::{PACKED_MATERIAL_SIZE, PackedMaterial};
use crate::node::SdfNode;

/// One SDF node as laid out in the kernel's `_Volumes` buffer.
/// This struct must match the WGSL `SdfData` layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PackedSdf {
    /// Inverse of translation * rotation (scale excluded), column-major
    pub world_to_model: [[f32; 4]; 4],
    pub size: [f32; 3],
    pub _pad0: f32,
    pub kind: u32,
    pub operation: u32,
    pub blend_strength: f32,
    pub _pad1: f32,
    pub data: [f32; 4],
    pub material: PackedMaterial,
}

/// Stride of one record in bytes: 26 floats, 2 tags and the material
pub const PACKED_SDF_STRIDE: usize =
    26 * size_of::<f32>() + 2 * size_of::<u32>() + PACKED_MATERIAL_SIZE;

const _: () = assert!(PACKED_SDF_STRIDE == 144);
const _: () = assert!(size_of::<PackedSdf>() == PACKED_SDF_STRIDE);
const _: () = assert!(PACKED_SDF_STRIDE % 16 == 0);
const _: () = assert!(offset_of!(PackedSdf, world_to_model) == 0);
const _: () = assert!(offset_of!(PackedSdf, size) == 64);
const _: () = assert!(offset_of!(PackedSdf, kind) == 80);
const _: () = assert!(offset_of!(PackedSdf, operation) == 84);
const _: () = assert!(offset_of!(PackedSdf, blend_strength) == 88);
const _: () = assert!(offset_of!(PackedSdf, data) == 96);
const _: () = assert!(offset_of!(PackedSdf, material) == 112);

/// Field name and byte offset of every member of [`PackedSdf`], in order
pub const PACKED_SDF_FIELDS: [(&str, usize); 10] = [
    ("world_to_model", offset_of!(PackedSdf, world_to_model)),
    ("size", offset_of!(PackedSdf, size)),
    ("_pad0", offset_of!(PackedSdf, _pad0)),
    ("kind", offset_of!(PackedSdf, kind)),
    ("operation", offset_of!(PackedSdf, operation)),
    ("blend_strength", offset_of!(PackedSdf, blend_strength)),
    ("_pad1", offset_of!(PackedSdf, _pad1)),
    ("data", offset_of!(PackedSdf, data)),
    ("material", offset_of!(PackedSdf, material)),
    ("material.metalness", offset_of!(PackedSdf, material) + offset_of!(PackedMaterial, metalness)),
];

impl From<&SdfNode> for PackedSdf {
    fn from(node: &SdfNode) -> Self {
        Self {
            world_to_model: node.transform.world_to_model().to_cols_array_2d(),
            size: node.transform.scale.to_array(),
            _pad0: 0.0,
            kind: node.kind.tag(),
            operation: node.operation.tag(),
            blend_strength: node.blend_strength,
            _pad1: 0.0,
            data: node.data.to_array(),
            material: PackedMaterial::from(&node.material),
        }
    }
}
