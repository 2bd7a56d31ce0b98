use crate::config::LocomotionConfig;
use crate::frame::FrameContext;
use crate::input::InputSlot;
use crate::math::{UnitQuatf, Vec2f, Vec3f};
use crate::xr::SessionState;

/// Level movement for one frame. Stick up (negative y) moves along the
/// horizontal part of the view direction; stick right strafes right.
pub fn displacement(axes: Vec2f, head_orientation: &UnitQuatf, speed: f32) -> Vec3f {
    let mut forward = head_orientation * -Vec3f::z();
    forward.y = 0.0;
    // Looking straight up or down leaves no horizontal heading.
    let Some(forward) = forward.try_normalize(1.0e-6) else {
        return Vec3f::zeros();
    };
    let right = forward.cross(&Vec3f::y());
    forward * (-axes.y) * speed + right * axes.x * speed
}

/// Adds the primary source's movement to the viewpoint.
pub fn integrate_locomotion(ctx: &mut FrameContext, config: &LocomotionConfig) {
    if ctx.session != SessionState::Active {
        return;
    }
    let primary = ctx.sources.get(InputSlot::Primary);
    if !primary.is_connected() {
        return;
    }
    let delta = displacement(primary.axes(), &ctx.viewer.head.orientation, config.speed);
    ctx.viewer.locomotion_offset += delta;
}
