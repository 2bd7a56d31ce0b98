//! Per-frame state shared by the input, interaction and locomotion steps.

use bevy_ecs::prelude::Resource;
use log::debug;

use crate::components::Transform;
use crate::config::SceneConfig;
use crate::geometry::RenderableMesh;
use crate::input::{DeviceReport, InputSlot, InputSources};
use crate::math::{Isometry3f, Mat4f, Pose, Vec3f};
use crate::xr::SessionState;

/// The loaded model and where it sits in the world.
#[derive(Debug)]
pub struct SceneModel {
    pub mesh: RenderableMesh,
    pub transform: Transform,
}

impl SceneModel {
    pub fn placement(&self) -> Isometry3f {
        self.transform.isometry()
    }

    /// Model-to-world matrix for the renderer.
    pub fn model_matrix(&self) -> Mat4f {
        self.transform.matrix()
    }

    /// Base and emissive colour for the renderer.
    pub fn material(&self, scene: &SceneConfig) -> ([f32; 3], [f32; 3]) {
        (scene.base_color, self.mesh.emissive(scene.highlight_emissive))
    }
}

/// Exclusive link between one input source and the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabRelationship {
    pub owner: InputSlot,
    /// Model placement relative to the owner, captured at grab start.
    pub offset: Isometry3f,
}

#[derive(Debug, Default)]
pub struct ViewerPose {
    /// Head pose in tracking space, as last reported by the device.
    pub head: Pose,
    /// Accumulated locomotion. Zero outside a session.
    pub locomotion_offset: Vec3f,
    pub desktop_camera: Transform,
}

impl ViewerPose {
    /// Head pose with locomotion applied.
    pub fn world_head(&self) -> Pose {
        self.head.translated(self.locomotion_offset)
    }
}

#[derive(Resource, Debug, Default)]
pub struct FrameContext {
    pub session: SessionState,
    pub sources: InputSources,
    pub model: Option<SceneModel>,
    pub grab: Option<GrabRelationship>,
    pub viewer: ViewerPose,
}

impl FrameContext {
    /// Pose of an input source in world space.
    pub fn source_world_pose(&self, slot: InputSlot) -> Pose {
        self.sources.get(slot).pose().translated(self.viewer.locomotion_offset)
    }

    /// Replaces the displayed model. Any grab on the old one is dropped.
    pub fn install_mesh(&mut self, mesh: RenderableMesh, anchor: Vec3f) {
        self.release_grab();
        self.model = Some(SceneModel {
            mesh,
            transform: Transform::from_position(anchor),
        });
    }

    /// Drops the current grab, if any, and clears the highlight.
    pub fn release_grab(&mut self) -> Option<InputSlot> {
        let grab = self.grab.take()?;
        if let Some(model) = self.model.as_mut() {
            model.mesh.set_highlighted(false);
        }
        Some(grab.owner)
    }

    /// Clears everything that must not outlive an immersive session.
    pub fn reset_session_state(&mut self) {
        if let Some(owner) = self.release_grab() {
            debug!("session over, releasing grab held by {:?}", owner);
        }
        self.sources.reset();
        self.viewer.locomotion_offset = Vec3f::zeros();
        self.viewer.head = Pose::default();
    }
}

/// Raw device state delivered by the runtime for one frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct FrameInput {
    pub head: Option<Pose>,
    pub devices: [Option<DeviceReport>; 2],
}

impl FrameInput {
    pub fn report(&self, slot: InputSlot) -> Option<&DeviceReport> {
        self.devices[slot.index()].as_ref()
    }
}
