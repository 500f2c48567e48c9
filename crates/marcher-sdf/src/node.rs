//! SDF scene nodes
//!
//! A node is a snapshot of one scene object: which shape it is, how it combines
//! with the shapes processed before it, where it sits and what it looks like.

use glam::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::material::Material;

/// Shape evaluated by the raymarch kernel.
///
/// The discriminants are the tag values written into [`PackedSdf::kind`](crate::PackedSdf).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum SdfKind {
    #[default]
    Sphere = 0,
    Box = 1,
    Torus = 2,
    Mandelbulb = 3,
}

impl SdfKind {
    pub const ALL: [SdfKind; 4] = [
        SdfKind::Sphere,
        SdfKind::Box,
        SdfKind::Torus,
        SdfKind::Mandelbulb,
    ];

    /// GPU tag value
    pub const fn tag(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            SdfKind::Sphere => "sphere",
            SdfKind::Box => "box",
            SdfKind::Torus => "torus",
            SdfKind::Mandelbulb => "mandelbulb",
        }
    }
}

/// How a node combines with the distance field accumulated from the nodes
/// before it.
///
/// Combination is order-dependent: `Cut` and `Mask` act on whatever has been
/// accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum SdfOperation {
    /// Plain union
    #[default]
    None = 0,
    /// Smooth union, smoothed by `blend_strength`
    Blend = 1,
    /// Subtraction
    Cut = 2,
    /// Intersection
    Mask = 3,
}

impl SdfOperation {
    pub const ALL: [SdfOperation; 4] = [
        SdfOperation::None,
        SdfOperation::Blend,
        SdfOperation::Cut,
        SdfOperation::Mask,
    ];

    /// GPU tag value
    pub const fn tag(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            SdfOperation::None => "none",
            SdfOperation::Blend => "blend",
            SdfOperation::Cut => "cut",
            SdfOperation::Mask => "mask",
        }
    }
}

/// Placement of a node in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    /// Per-kind shape parameters (radius, box extents, ...), not a uniform
    /// scale of the distance field.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Model-to-world matrix built from translation and rotation only
    pub fn rigid_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_quat(self.rotation)
    }

    /// World-to-model matrix as consumed by the kernel.
    ///
    /// Scale is left out: the kernel reads it from the record's `size` field
    /// and interprets it per shape kind. Folding it into the matrix would
    /// require dividing every distance by the scale afterwards.
    pub fn world_to_model(&self) -> Mat4 {
        self.rigid_matrix().inverse()
    }
}

/// A single SDF object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdfNode {
    /// Label used in log output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: SdfKind,
    #[serde(default)]
    pub operation: SdfOperation,
    #[serde(default)]
    pub transform: Transform,
    /// Smoothing factor for [`SdfOperation::Blend`], expected in `[0, 1]`
    #[serde(default)]
    pub blend_strength: f32,
    /// Kind-specific extra parameters (e.g. fractal power and iterations)
    #[serde(default)]
    pub data: Vec4,
    #[serde(default)]
    pub material: Material,
    /// Position in the combination sequence; lower values are processed first
    #[serde(default)]
    pub order: i32,
    /// Inactive nodes are left out of scene snapshots
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl SdfNode {
    pub fn new(kind: SdfKind) -> Self {
        Self {
            name: None,
            kind,
            operation: SdfOperation::None,
            transform: Transform::default(),
            blend_strength: 0.0,
            data: Vec4::ZERO,
            material: Material::default(),
            order: 0,
            active: true,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(SdfKind::Sphere).with_scale(Vec3::splat(radius))
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(SdfKind::Box).with_scale(half_extents)
    }

    /// Torus with the major radius in `scale.x` and the minor radius in `scale.y`
    pub fn torus(major_radius: f32, minor_radius: f32) -> Self {
        Self::new(SdfKind::Torus).with_scale(Vec3::new(major_radius, minor_radius, 0.0))
    }

    /// Mandelbulb; `data.x` is the power, `data.y` the iteration count
    pub fn mandelbulb(power: f32, iterations: u32) -> Self {
        Self::new(SdfKind::Mandelbulb).with_data(Vec4::new(power, iterations as f32, 0.0, 0.0))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_operation(mut self, operation: SdfOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Smooth-union into the accumulated field
    pub fn blend(self, strength: f32) -> Self {
        self.with_operation(SdfOperation::Blend)
            .with_blend_strength(strength)
    }

    pub fn with_blend_strength(mut self, strength: f32) -> Self {
        self.blend_strength = strength;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn with_data(mut self, data: Vec4) -> Self {
        self.data = data;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Name for log output, falling back to the shape kind
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_match_discriminants() {
        for (i, kind) in SdfKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag(), i as u32);
        }
        for (i, op) in SdfOperation::ALL.iter().enumerate() {
            assert_eq!(op.tag(), i as u32);
        }
    }

    #[test]
    fn test_world_to_model_ignores_scale() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Quat::from_rotation_y(0.7))
            .with_scale(Vec3::new(4.0, 5.0, 6.0));
        let unscaled = t.with_scale(Vec3::ONE);

        assert_eq!(t.world_to_model(), unscaled.world_to_model());
    }

    #[test]
    fn test_world_to_model_maps_position_to_origin() {
        let t = Transform::from_position(Vec3::new(-2.0, 0.5, 9.0))
            .with_rotation(Quat::from_rotation_x(1.2));
        let local = t.world_to_model().transform_point3(t.position);

        assert!(local.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_node_label() {
        assert_eq!(SdfNode::sphere(1.0).label(), "sphere");
        assert_eq!(SdfNode::sphere(1.0).named("ball").label(), "ball");
    }

    #[test]
    fn test_node_defaults_from_json() {
        let node: SdfNode = serde_json::from_str(r#"{ "kind": "torus" }"#).unwrap();

        assert_eq!(node.kind, SdfKind::Torus);
        assert_eq!(node.operation, SdfOperation::None);
        assert_eq!(node.transform, Transform::default());
        assert!(node.active);
        assert_eq!(node.order, 0);
    }
}
