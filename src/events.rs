use bevy_ecs::prelude::*;

use crate::input::{DeviceKind, InputSlot};

/// Connection changes reported by the XR runtime subscription.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Connected { slot: InputSlot, kind: DeviceKind },
    Disconnected { slot: InputSlot },
}

/// Normalized per-frame input, consumed by the interaction resolver in order.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Connected { slot: InputSlot, kind: DeviceKind },
    Disconnected { slot: InputSlot },
    SelectStart { slot: InputSlot },
    SelectEnd { slot: InputSlot },
}

impl InputEvent {
    pub fn slot(&self) -> InputSlot {
        match *self {
            InputEvent::Connected { slot, .. }
            | InputEvent::Disconnected { slot }
            | InputEvent::SelectStart { slot }
            | InputEvent::SelectEnd { slot } => slot,
        }
    }
}
