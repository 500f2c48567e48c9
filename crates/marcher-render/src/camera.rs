//! Camera data for the raymarch pass

use glam::{Mat4, Vec3, Vec4};

/// Per-frame camera state the host hands to the pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub camera_to_world: Mat4,
    pub projection: Mat4,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

/// A look-at camera, used by hosts that don't manage their own matrices
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera is looking at
    pub target: Vec3,
    /// Up vector (usually Y-up)
    pub up: Vec3,
    /// Field of view in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(2.0, 1.5, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera looking at a target from a position
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    /// Get the view matrix (world to camera transform)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Camera to world transform (inverse of the view matrix)
    pub fn camera_to_world(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    /// Get the projection matrix (depth range 0..1)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get the forward direction (normalized)
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Parameters for turning a stored depth value back into linear depth.
    ///
    /// For a depth sample `d`, `1 / (x * d + y)` is the linear depth in
    /// `near/far..1` and `1 / (z * d + w)` is the eye depth.
    pub fn z_buffer_params(&self) -> Vec4 {
        let x = 1.0 - self.far / self.near;
        let y = self.far / self.near;
        Vec4::new(x, y, x / self.far, y / self.far)
    }

    /// Snapshot for a frame of the given pixel size; also updates the aspect ratio
    pub fn camera_data(&mut self, pixel_width: u32, pixel_height: u32) -> CameraData {
        if pixel_height > 0 {
            self.aspect = pixel_width as f32 / pixel_height as f32;
        }
        CameraData {
            camera_to_world: self.camera_to_world(),
            projection: self.projection_matrix(),
            pixel_width,
            pixel_height,
        }
    }
}
