//! WGSL declarations of the packed record layout
//!
//! Kernels include these instead of declaring the structs by hand so the
//! GPU-side layout always comes from the same crate as [`PackedSdf`](crate::PackedSdf).
//! `vec3` members are followed by scalar padding because WGSL aligns `vec3`
//! to 16 bytes.

/// WGSL mirror of [`PackedMaterial`](crate::PackedMaterial), 32 bytes
pub const SDF_MATERIAL_WGSL: &str = r#"struct SdfMaterial {
    color: vec3<f32>,
    roughness: f32,
    metalness: f32,
    pad0: f32,
    pad1: f32,
    pad2: f32,
}
"#;

/// WGSL mirror of [`PackedSdf`](crate::PackedSdf), 144 bytes
pub const SDF_DATA_WGSL: &str = r#"struct SdfData {
    world_to_model: mat4x4<f32>,
    size: vec3<f32>,
    pad0: f32,
    kind: u32,
    operation: u32,
    blend_strength: f32,
    pad1: f32,
    data: vec4<f32>,
    material: SdfMaterial,
}
"#;

/// Shape tag constants matching [`SdfKind`](crate::SdfKind)
pub const SDF_KIND_WGSL: &str = r#"const SDF_SPHERE: u32 = 0u;
const SDF_BOX: u32 = 1u;
const SDF_TORUS: u32 = 2u;
const SDF_MANDELBULB: u32 = 3u;
"#;

/// Operation tag constants matching [`SdfOperation`](crate::SdfOperation)
pub const SDF_OPERATION_WGSL: &str = r#"const OP_NONE: u32 = 0u;
const OP_BLEND: u32 = 1u;
const OP_CUT: u32 = 2u;
const OP_MASK: u32 = 3u;
"#;

/// All record declarations, in dependency order
pub fn record_declarations() -> String {
    [
        SDF_KIND_WGSL,
        SDF_OPERATION_WGSL,
        SDF_MATERIAL_WGSL,
        SDF_DATA_WGSL,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SdfKind, SdfOperation};

    #[test]
    fn test_tag_constants_match_enums() {
        for kind in SdfKind::ALL {
            let line = format!(
                "const SDF_{}: u32 = {}u;",
                kind.name().to_uppercase(),
                kind.tag()
            );
            assert!(SDF_KIND_WGSL.contains(&line), "missing {line}");
        }
        for op in SdfOperation::ALL {
            let line = format!(
                "const OP_{}: u32 = {}u;",
                op.name().to_uppercase(),
                op.tag()
            );
            assert!(SDF_OPERATION_WGSL.contains(&line), "missing {line}");
        }
    }

    #[test]
    fn test_declarations_order() {
        let all = record_declarations();
        let material = all.find("struct SdfMaterial").unwrap_or(usize::MAX);
        let data = all.find("struct SdfData").unwrap_or(0);
        assert!(material < data);
    }
}
