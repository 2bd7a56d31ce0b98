use bevy_ecs::prelude::Resource;

use crate::math::{color_from_hex, Vec3f};
use crate::xr::XrFeature;

#[derive(Debug, Clone)]
pub struct GeometryConfig {
    /// Longest bounding-box side after normalization.
    pub target_size: f32,
}

#[derive(Debug, Clone)]
pub struct InputConfig {
    pub deadzone: f32,
    /// Thumb tip to index tip distance (metres) that starts a pinch.
    pub pinch_start_distance: f32,
    /// Distance that ends it again. Larger than the start distance.
    pub pinch_end_distance: f32,
}

#[derive(Debug, Clone)]
pub struct LocomotionConfig {
    /// World units per frame at full stick deflection.
    pub speed: f32,
}

#[derive(Debug, Clone)]
pub struct InteractionConfig {
    pub max_ray_distance: f32,
}

#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub model_anchor: Vec3f,
    /// Radians per desktop frame.
    pub auto_rotate_speed: f32,
    pub base_color: [f32; 3],
    pub highlight_emissive: [f32; 3],
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub required_features: Vec<XrFeature>,
    pub optional_features: Vec<XrFeature>,
}

#[derive(Debug, Clone)]
pub struct DesktopConfig {
    pub camera_position: Vec3f,
    pub orbit_target: Vec3f,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub zoom_sensitivity: f32,
}

#[derive(Debug, Clone, Resource)]
pub struct ViewerConfig {
    pub geometry: GeometryConfig,
    pub input: InputConfig,
    pub locomotion: LocomotionConfig,
    pub interaction: InteractionConfig,
    pub scene: SceneConfig,
    pub session: SessionConfig,
    pub desktop: DesktopConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig { target_size: 2.0 },
            input: InputConfig {
                deadzone: 0.1,
                pinch_start_distance: 0.02,
                pinch_end_distance: 0.04,
            },
            locomotion: LocomotionConfig { speed: 0.1 },
            interaction: InteractionConfig {
                max_ray_distance: f32::MAX,
            },
            scene: SceneConfig {
                model_anchor: Vec3f::new(0.0, 1.0, 0.0),
                auto_rotate_speed: 0.005,
                base_color: color_from_hex(0x00D4FF),
                highlight_emissive: color_from_hex(0x444444),
            },
            session: SessionConfig {
                required_features: vec![XrFeature::LocalFloor],
                optional_features: vec![XrFeature::HandTracking, XrFeature::BoundedFloor],
            },
            desktop: DesktopConfig {
                camera_position: Vec3f::new(0.0, 1.6, 3.0),
                orbit_target: Vec3f::new(0.0, 1.0, 0.0),
                min_distance: 1.0,
                max_distance: 20.0,
                rotate_sensitivity: 0.005,
                pan_sensitivity: 0.002,
                zoom_sensitivity: 0.5,
            },
        }
    }
}
