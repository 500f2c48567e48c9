//! Raymarch pass configuration
//!
//! Everything here is plain data and serializable. GPU handles (the compute
//! program and an explicit composite target) live on the pass itself.

use serde::{Deserialize, Serialize};

/// Output shading of the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ColorMode {
    /// Physically based shading using each node's material
    #[default]
    Brdf = 0,
    /// March iteration count, tinted with the heatmap color
    Heatmap = 1,
}

impl ColorMode {
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// Where in the host's frame the pass is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassEvent {
    BeforeRendering,
    AfterOpaques,
    AfterTransparents,
    BeforePostProcessing,
    AfterPostProcessing,
    #[default]
    AfterRendering,
}

/// Settings for the raymarch pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaymarchSettings {
    /// Insertion point in the host's render sequence
    pub insert_at: PassEvent,
    /// Upper bound on march steps per ray
    pub max_iterations: u32,
    /// Rays stop once they travel this far
    pub max_distance: f32,
    /// Surface hit threshold
    pub min_distance: f32,
    /// Offset applied to shadow rays to avoid self-intersection
    pub shadow_bias: f32,
    pub color_mode: ColorMode,
    /// Tint for [`ColorMode::Heatmap`] (RGBA, 0-1)
    pub heatmap_color: [f32; 4],
}

impl Default for RaymarchSettings {
    fn default() -> Self {
        Self {
            insert_at: PassEvent::AfterRendering,
            max_iterations: 128,
            max_distance: 100.0,
            min_distance: 0.001,
            shadow_bias: 0.05,
            color_mode: ColorMode::Brdf,
            heatmap_color: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RaymarchSettings {
    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_insert_at(mut self, event: PassEvent) -> Self {
        self.insert_at = event;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RaymarchSettings::default();
        assert_eq!(settings.max_iterations, 128);
        assert_eq!(settings.max_distance, 100.0);
        assert_eq!(settings.min_distance, 0.001);
        assert_eq!(settings.shadow_bias, 0.05);
        assert_eq!(settings.color_mode, ColorMode::Brdf);
        assert_eq!(settings.heatmap_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(settings.insert_at, PassEvent::AfterRendering);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: RaymarchSettings =
            serde_json::from_str(r#"{ "color_mode": "heatmap", "max_iterations": 64 }"#).unwrap();

        assert_eq!(settings.color_mode, ColorMode::Heatmap);
        assert_eq!(settings.max_iterations, 64);
        assert_eq!(settings.shadow_bias, 0.05);
    }

    #[test]
    fn test_json_round_trip() {
        let settings = RaymarchSettings::default()
            .with_color_mode(ColorMode::Heatmap)
            .with_insert_at(PassEvent::BeforePostProcessing);
        let json = serde_json::to_string(&settings).unwrap();

        assert_eq!(
            serde_json::from_str::<RaymarchSettings>(&json).unwrap(),
            settings
        );
    }

    #[test]
    fn test_color_mode_tags() {
        assert_eq!(ColorMode::Brdf.tag(), 0);
        assert_eq!(ColorMode::Heatmap.tag(), 1);
    }
}
