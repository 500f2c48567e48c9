//! Binding names shared with the raymarch kernel
//!
//! Every value the pass hands to the compute backend is addressed by one of
//! these names.

/// Color texture the kernel reads and composites over
pub const SOURCE: &str = "Source";
/// Temporary random-write output texture
pub const DESTINATION: &str = "Destination";
pub const DEPTH_TEXTURE: &str = "_DepthTexture";

pub const COLOR_MODE: &str = "_ColorMode";
pub const HEATMAP_COLOR: &str = "_HeatmapColor";
pub const CAMERA_TO_WORLD: &str = "_CameraToWorldMatrix";
/// Inverse projection matrix
pub const PROJECTION_TO_CAMERA: &str = "_ProjectionToCameraMatrix";
pub const MAX_ITERATIONS: &str = "_MaxIterations";
pub const MIN_DISTANCE: &str = "_MinDistance";
pub const MAX_DISTANCE: &str = "_MaxDistance";
pub const SHADOW_BIAS: &str = "_ShadowBias";
/// Depth reconstruction parameters supplied by the host
pub const Z_BUFFER_PARAMS: &str = "_ZBufferParams";
/// Number of records in the scene buffer
pub const VOLUME_COUNT: &str = "_VolumeCount";

/// Packed scene buffer
pub const VOLUMES: &str = "_Volumes";

pub const TEXTURES: [&str; 3] = [SOURCE, DESTINATION, DEPTH_TEXTURE];

/// Scalar, vector and matrix parameters, in the order the pass sets them
pub const UNIFORMS: [&str; 10] = [
    COLOR_MODE,
    HEATMAP_COLOR,
    CAMERA_TO_WORLD,
    PROJECTION_TO_CAMERA,
    MAX_ITERATIONS,
    MIN_DISTANCE,
    MAX_DISTANCE,
    SHADOW_BIAS,
    Z_BUFFER_PARAMS,
    VOLUME_COUNT,
];
