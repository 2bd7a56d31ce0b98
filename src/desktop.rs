//! Flat-screen viewing: pointer orbit controls and idle model rotation.

use bevy_ecs::prelude::Resource;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

use crate::components::Transform;
use crate::config::{DesktopConfig, SceneConfig};
use crate::frame::FrameContext;
use crate::math::{Vec2f, Vec3f};
use crate::xr::SessionState;

const SAFE_FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2 - 0.0001;

/// Left-drag orbits, right-drag pans, the wheel zooms.
#[derive(Resource, Debug)]
pub struct OrbitController {
    target: Vec3f,
    yaw: f32,
    pitch: f32,
    distance: f32,
    rotating: bool,
    panning: bool,
    rotate_delta: Vec2f,
    pan_delta: Vec2f,
    scroll: f32,
    config: DesktopConfig,
}

impl OrbitController {
    pub fn new(config: &DesktopConfig) -> Self {
        let offset = config.camera_position - config.orbit_target;
        let distance = offset.norm().clamp(config.min_distance, config.max_distance);
        let (yaw, pitch) = if offset.norm_squared() > f32::EPSILON {
            let dir = offset.normalize();
            (dir.x.atan2(dir.z), dir.y.asin())
        } else {
            (0.0, 0.0)
        };
        Self {
            target: config.orbit_target,
            yaw,
            pitch,
            distance,
            rotating: false,
            panning: false,
            rotate_delta: Vec2f::zeros(),
            pan_delta: Vec2f::zeros(),
            scroll: 0.0,
            config: config.clone(),
        }
    }

    pub fn target(&self) -> Vec3f {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn process_button(&mut self, button: MouseButton, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => {
                self.rotating = pressed;
                true
            }
            MouseButton::Right => {
                self.panning = pressed;
                true
            }
            _ => false,
        }
    }

    pub fn process_mouse(&mut self, mouse_dx: f64, mouse_dy: f64) {
        let delta = Vec2f::new(mouse_dx as f32, mouse_dy as f32);
        if self.rotating {
            self.rotate_delta += delta;
        } else if self.panning {
            self.pan_delta += delta;
        }
    }

    pub fn process_scroll(&mut self, delta: &MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, scroll) => -scroll,
            // Roughly 100 pixels per line
            MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => -*scroll as f32 / 100.0,
        };
    }

    /// Applies accumulated pointer input and places the camera.
    pub fn update_camera(&mut self, camera: &mut Transform) {
        self.yaw -= self.rotate_delta.x * self.config.rotate_sensitivity;
        self.pitch = (self.pitch + self.rotate_delta.y * self.config.rotate_sensitivity)
            .clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2);

        self.distance = (self.distance + self.scroll * self.config.zoom_sensitivity)
            .clamp(self.config.min_distance, self.config.max_distance);

        // Pan in the camera plane, scaled by distance so the model tracks the pointer.
        let pan = self.pan_delta * self.config.pan_sensitivity * self.distance;
        self.target += camera.right() * -pan.x + camera.up() * pan.y;

        self.rotate_delta = Vec2f::zeros();
        self.pan_delta = Vec2f::zeros();
        self.scroll = 0.0;

        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let dir = Vec3f::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw);
        camera.set_position(self.target + dir * self.distance);
        camera.look_at(self.target);
    }
}

/// Idle spin of the model while nobody is in a session or holding it.
pub fn auto_rotate(ctx: &mut FrameContext, config: &SceneConfig) {
    if ctx.session != SessionState::Inactive || ctx.grab.is_some() {
        return;
    }
    if let Some(model) = ctx.model.as_mut() {
        model.transform.rotate_axis(&Vec3f::y_axis(), config.auto_rotate_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn close(a: Vec3f, b: Vec3f) -> bool {
        (a - b).norm() < 1e-4
    }

    #[test]
    fn starts_at_configured_camera_position() {
        let config = ViewerConfig::default().desktop;
        let mut orbit = OrbitController::new(&config);
        let mut camera = Transform::default();
        orbit.update_camera(&mut camera);
        assert!(close(camera.position(), config.camera_position));
        let to_target = (config.orbit_target - camera.position()).normalize();
        assert!(close(camera.forward(), to_target));
    }

    #[test]
    fn zoom_is_clamped() {
        let config = ViewerConfig::default().desktop;
        let mut orbit = OrbitController::new(&config);
        let mut camera = Transform::default();
        for _ in 0..100 {
            orbit.process_scroll(&MouseScrollDelta::LineDelta(0.0, 1.0));
        }
        orbit.update_camera(&mut camera);
        assert_eq!(orbit.distance(), config.min_distance);
        for _ in 0..100 {
            orbit.process_scroll(&MouseScrollDelta::LineDelta(0.0, -1.0));
        }
        orbit.update_camera(&mut camera);
        assert_eq!(orbit.distance(), config.max_distance);
    }

    #[test]
    fn drag_without_button_is_ignored() {
        let config = ViewerConfig::default().desktop;
        let mut orbit = OrbitController::new(&config);
        let mut camera = Transform::default();
        orbit.update_camera(&mut camera);
        let before = camera.position();
        orbit.process_mouse(40.0, 10.0);
        orbit.update_camera(&mut camera);
        assert!(close(camera.position(), before));
    }

    #[test]
    fn left_drag_orbits_at_constant_distance() {
        let config = ViewerConfig::default().desktop;
        let mut orbit = OrbitController::new(&config);
        let mut camera = Transform::default();
        orbit.process_button(MouseButton::Left, ElementState::Pressed);
        orbit.process_mouse(120.0, 0.0);
        orbit.update_camera(&mut camera);
        assert!(!close(camera.position(), config.camera_position));
        let radius = (camera.position() - orbit.target()).norm();
        assert!((radius - orbit.distance()).abs() < 1e-4);
    }

    #[test]
    fn right_drag_pans_the_target() {
        let config = ViewerConfig::default().desktop;
        let mut orbit = OrbitController::new(&config);
        let mut camera = Transform::default();
        orbit.update_camera(&mut camera);
        orbit.process_button(MouseButton::Right, ElementState::Pressed);
        orbit.process_mouse(50.0, 0.0);
        orbit.update_camera(&mut camera);
        assert!(orbit.target().x < config.orbit_target.x);
    }

    #[test]
    fn auto_rotation_only_when_idle() {
        let scene = ViewerConfig::default().scene;
        let mut ctx = FrameContext::default();
        let mesh = crate::geometry::RenderableMesh::from_triangles(
            &[crate::geometry::Triangle {
                normal: Vec3f::zeros(),
                vertices: [Vec3f::zeros(), Vec3f::x(), Vec3f::y()],
            }],
            2.0,
        )
        .unwrap();
        ctx.install_mesh(mesh, scene.model_anchor);

        auto_rotate(&mut ctx, &scene);
        let angle = ctx.model.as_ref().unwrap().transform.rotation().angle();
        assert!((angle - scene.auto_rotate_speed).abs() < 1e-6);

        ctx.session = SessionState::Active;
        auto_rotate(&mut ctx, &scene);
        let still = ctx.model.as_ref().unwrap().transform.rotation().angle();
        assert!((still - angle).abs() < 1e-6);
    }
}
