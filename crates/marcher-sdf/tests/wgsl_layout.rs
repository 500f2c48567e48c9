//! The WGSL record declarations, laid out by naga, against the Rust records

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use marcher_sdf::{PACKED_MATERIAL_SIZE, PACKED_SDF_FIELDS, PACKED_SDF_STRIDE, wgsl};

/// Member names with byte offsets, plus the total size, of a declared struct
fn struct_layout(module: &naga::Module, name: &str) -> (Vec<(String, usize)>, usize) {
    module
        .types
        .iter()
        .find_map(|(_, ty)| match &ty.inner {
            naga::TypeInner::Struct { members, span } if ty.name.as_deref() == Some(name) => {
                let members = members
                    .iter()
                    .map(|m| (m.name.clone().unwrap_or_default(), m.offset as usize))
                    .collect();
                Some((members, *span as usize))
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("struct {name} is not declared"))
}

fn record_module() -> naga::Module {
    let source = wgsl::record_declarations();
    let module = naga::front::wgsl::parse_str(&source).expect("wgsl parse");
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator.validate(&module).expect("wgsl validate");
    module
}

#[test]
fn sdf_data_offsets_match_packed_record() {
    let module = record_module();
    let (members, span) = struct_layout(&module, "SdfData");

    let expected: Vec<(String, usize)> = PACKED_SDF_FIELDS
        .iter()
        .filter(|(name, _)| !name.contains('.'))
        .map(|(name, offset)| (name.trim_start_matches('_').to_string(), *offset))
        .collect();

    assert_eq!(members, expected);
    assert_eq!(span, PACKED_SDF_STRIDE);
}

#[test]
fn sdf_material_matches_packed_material() {
    let module = record_module();
    let (members, span) = struct_layout(&module, "SdfMaterial");

    let (_, material) = PACKED_SDF_FIELDS
        .iter()
        .find(|(name, _)| *name == "material")
        .unwrap();
    let (_, metalness) = PACKED_SDF_FIELDS
        .iter()
        .find(|(name, _)| *name == "material.metalness")
        .unwrap();
    let wgsl_metalness = members
        .iter()
        .find(|(name, _)| name == "metalness")
        .map(|(_, offset)| *offset)
        .unwrap();

    assert_eq!(span, PACKED_MATERIAL_SIZE);
    assert_eq!(members[0], ("color".to_string(), 0));
    assert_eq!(material + wgsl_metalness, *metalness);
}
