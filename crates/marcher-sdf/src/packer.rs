//! Scene packer
//!
//! Serializes an ordered node snapshot into the contiguous record buffer the
//! raymarch kernel consumes.

use crate::node::SdfNode;
use crate::packed::{PACKED_SDF_STRIDE, PackedSdf};

/// The packed form of one frame's scene.
///
/// Records keep the order of the nodes they were built from; the kernel folds
/// them into the distance field front to back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedScene {
    records: Vec<PackedSdf>,
}

impl PackedScene {
    pub fn records(&self) -> &[PackedSdf] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw bytes ready for a GPU buffer upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// Size of the serialized buffer in bytes
    pub fn byte_len(&self) -> usize {
        self.records.len() * PACKED_SDF_STRIDE
    }
}

impl FromIterator<PackedSdf> for PackedScene {
    fn from_iter<I: IntoIterator<Item = PackedSdf>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Pack nodes into GPU records, one per node, in input order.
///
/// Node values are not validated.
pub fn pack(nodes: &[SdfNode]) -> PackedScene {
    let scene: PackedScene = nodes.iter().map(PackedSdf::from).collect();
    tracing::trace!(
        count = scene.count(),
        bytes = scene.byte_len(),
        "packed scene"
    );
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SdfKind, SdfOperation};
    use glam::Vec3;

    #[test]
    fn test_pack_empty() {
        let scene = pack(&[]);
        assert!(scene.is_empty());
        assert_eq!(scene.count(), 0);
        assert!(scene.as_bytes().is_empty());
    }

    #[test]
    fn test_pack_count_matches_input() {
        for n in [0usize, 1, 2, 7, 64] {
            let nodes: Vec<SdfNode> = (0..n)
                .map(|i| SdfNode::sphere(i as f32 + 1.0))
                .collect();
            let scene = pack(&nodes);

            assert_eq!(scene.count(), n);
            assert_eq!(scene.as_bytes().len(), n * PACKED_SDF_STRIDE);
            assert_eq!(scene.byte_len(), scene.as_bytes().len());
        }
    }

    #[test]
    fn test_pack_preserves_order() {
        let nodes = vec![
            SdfNode::sphere(1.0).blend(0.5),
            SdfNode::cuboid(Vec3::splat(0.5)).with_operation(SdfOperation::Cut),
        ];
        let scene = pack(&nodes);
        let records = scene.records();

        assert_eq!(records[0].kind, SdfKind::Sphere.tag());
        assert_eq!(records[0].operation, SdfOperation::Blend.tag());
        assert_eq!(records[0].blend_strength, 0.5);
        assert_eq!(records[1].kind, SdfKind::Box.tag());
        assert_eq!(records[1].operation, SdfOperation::Cut.tag());
    }

    #[test]
    fn test_pack_passes_malformed_values_through() {
        let node = SdfNode::sphere(-3.0).with_blend_strength(f32::INFINITY);
        let scene = pack(&[node]);

        assert_eq!(scene.records()[0].size, [-3.0, -3.0, -3.0]);
        assert_eq!(scene.records()[0].blend_strength, f32::INFINITY);
    }
}
