mod schedules;

use bevy_ecs::prelude::*;

use crate::config::ViewerConfig;
use crate::desktop::{auto_rotate, OrbitController};
use crate::events::{DeviceEvent, InputEvent};
use crate::frame::{FrameContext, FrameInput};
use crate::input::poll_input_sources;
use crate::interaction::{follow_grab, resolve_interactions};
use crate::locomotion::integrate_locomotion;

pub use schedules::{new_desktop_schedule, new_frame_schedule, DesktopLabel, FrameLabel};

pub fn update_head_pose(mut ctx: ResMut<FrameContext>, frame: Res<FrameInput>) {
    if let Some(head) = frame.head {
        ctx.viewer.head = head;
    }
}

pub fn poll_input(
    mut ctx: ResMut<FrameContext>,
    frame: Res<FrameInput>,
    config: Res<ViewerConfig>,
    mut device_events: EventReader<DeviceEvent>,
    mut input_events: EventWriter<InputEvent>,
) {
    let devices: Vec<DeviceEvent> = device_events.iter().copied().collect();
    let events = poll_input_sources(&mut ctx, &devices, &frame, &config.input);
    input_events.send_batch(events);
}

pub fn resolve_grabs(
    mut ctx: ResMut<FrameContext>,
    config: Res<ViewerConfig>,
    mut input_events: EventReader<InputEvent>,
) {
    let events: Vec<InputEvent> = input_events.iter().copied().collect();
    resolve_interactions(&mut ctx, &events, &config.interaction);
}

pub fn move_viewer(mut ctx: ResMut<FrameContext>, config: Res<ViewerConfig>) {
    integrate_locomotion(&mut ctx, &config.locomotion);
}

pub fn carry_grabbed_model(mut ctx: ResMut<FrameContext>) {
    follow_grab(&mut ctx);
}

pub fn spin_idle_model(mut ctx: ResMut<FrameContext>, config: Res<ViewerConfig>) {
    auto_rotate(&mut ctx, &config.scene);
}

pub fn update_desktop_camera(mut ctx: ResMut<FrameContext>, mut orbit: ResMut<OrbitController>) {
    orbit.update_camera(&mut ctx.viewer.desktop_camera);
}
