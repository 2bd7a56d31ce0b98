use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ScheduleLabel;

use crate::events::{DeviceEvent, InputEvent};
use crate::systems::{
    carry_grabbed_model, move_viewer, poll_input, resolve_grabs, spin_idle_model,
    update_desktop_camera, update_head_pose,
};

/// One immersive frame. Input is normalized first, then grabs are resolved,
/// then the viewer moves; the grabbed model follows last.
#[derive(ScheduleLabel, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FrameLabel;

pub fn new_frame_schedule() -> (Schedule, FrameLabel) {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            update_head_pose,
            poll_input,
            resolve_grabs,
            move_viewer,
            carry_grabbed_model,
            Events::<DeviceEvent>::update_system,
            Events::<InputEvent>::update_system,
        )
            .chain(),
    );
    (schedule, FrameLabel)
}

#[derive(ScheduleLabel, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DesktopLabel;

pub fn new_desktop_schedule() -> (Schedule, DesktopLabel) {
    let mut schedule = Schedule::default();
    schedule.add_systems((spin_idle_model, update_desktop_camera).chain());
    (schedule, DesktopLabel)
}
