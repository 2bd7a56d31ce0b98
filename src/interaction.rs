//! Ray-based grabbing of the loaded model.

use log::{debug, info};
use rapier3d::parry::query::Ray;

use crate::config::InteractionConfig;
use crate::events::InputEvent;
use crate::frame::{FrameContext, GrabRelationship};
use crate::input::InputSlot;
use crate::math::Point3f;

/// World-space ray from a source's position along its -Z axis.
pub fn source_ray(ctx: &FrameContext, slot: InputSlot) -> Ray {
    let pose = ctx.source_world_pose(slot);
    Ray::new(Point3f::from(pose.position), pose.forward())
}

/// Applies the frame's input events in order. The first source to hit an
/// ungrabbed model owns it until it releases or disconnects.
pub fn resolve_interactions(ctx: &mut FrameContext, events: &[InputEvent], config: &InteractionConfig) {
    for event in events {
        match *event {
            InputEvent::SelectStart { slot } => try_grab(ctx, slot, config),
            InputEvent::SelectEnd { slot } => {
                if owner(ctx) == Some(slot) {
                    ctx.release_grab();
                    info!("{:?} released the model", slot);
                }
            }
            InputEvent::Disconnected { slot } => {
                if owner(ctx) == Some(slot) {
                    ctx.release_grab();
                    info!("{:?} disconnected while grabbing, released", slot);
                }
            }
            InputEvent::Connected { .. } => {}
        }
    }
}

/// Moves a grabbed model along with its owner.
pub fn follow_grab(ctx: &mut FrameContext) {
    let Some(grab) = ctx.grab else {
        return;
    };
    let owner_pose = ctx.source_world_pose(grab.owner).isometry();
    if let Some(model) = ctx.model.as_mut() {
        model.transform.set_isometry(&(owner_pose * grab.offset));
    }
}

fn owner(ctx: &FrameContext) -> Option<InputSlot> {
    ctx.grab.map(|g| g.owner)
}

fn try_grab(ctx: &mut FrameContext, slot: InputSlot, config: &InteractionConfig) {
    if let Some(current) = owner(ctx) {
        debug!("{:?} select ignored, model held by {:?}", slot, current);
        return;
    }
    let ray = source_ray(ctx, slot);
    let owner_pose = ctx.source_world_pose(slot).isometry();
    let Some(model) = ctx.model.as_mut() else {
        return;
    };
    let placement = model.placement();
    let Some(distance) = model.mesh.intersect_ray(&ray, &placement, config.max_ray_distance) else {
        debug!("{:?} select missed the model", slot);
        return;
    };

    model.mesh.set_highlighted(true);
    ctx.grab = Some(GrabRelationship {
        owner: slot,
        offset: owner_pose.inverse() * placement,
    });
    info!("{:?} grabbed the model at distance {:.3}", slot, distance);
}
