//! Marcher SDF - Platform-agnostic scene model and GPU record packing
//!
//! This crate holds everything about an SDF scene that does not touch the GPU:
//! the node model, the fixed-layout records the raymarch kernel reads, the
//! packer that turns a frame's nodes into a contiguous buffer, and the WGSL
//! declarations that mirror the record layout.
//!
//! ## Key Types
//!
//! - [`SdfNode`] - One scene object (shape, combination mode, transform, material)
//! - [`PackedSdf`] - The 144-byte GPU record built from a node
//! - [`PackedScene`] - A frame's worth of records, in node order
//! - [`SceneSource`] - Supplies the ordered active node set each frame
//!
//! ## Example
//!
//! ```rust
//! use marcher_sdf::{SdfNode, SdfOperation, pack};
//! use glam::Vec3;
//!
//! let nodes = [
//!     SdfNode::sphere(1.0),
//!     SdfNode::cuboid(Vec3::splat(0.6)).with_operation(SdfOperation::Cut),
//! ];
//! let scene = pack(&nodes);
//! assert_eq!(scene.count(), 2);
//! assert_eq!(scene.as_bytes().len(), 2 * marcher_sdf::PACKED_SDF_STRIDE);
//! ```

mod material;
mod node;
mod packed;
mod packer;
mod scene;
pub mod wgsl;

pub use material::{Material, PACKED_MATERIAL_SIZE, PackedMaterial};
pub use node::{SdfKind, SdfNode, SdfOperation, Transform};
pub use packed::{PACKED_SDF_FIELDS, PACKED_SDF_STRIDE, PackedSdf};
pub use packer::{PackedScene, pack};
pub use scene::{Scene, SceneError, SceneSource};
