//! Normalizes controllers and tracked hands into one input-source shape.
//! Downstream systems only see poses, movement axes and selection edges.

mod controller;
mod hand;

pub use controller::{apply_deadzone, ControllerAdapter, ControllerReport};
pub use hand::{HandAdapter, HandReport};

use log::{debug, info};

use crate::config::InputConfig;
use crate::events::{DeviceEvent, InputEvent};
use crate::frame::{FrameContext, FrameInput};
use crate::math::{Pose, Vec2f};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSlot {
    /// Left hand. Drives locomotion.
    Primary,
    /// Right hand.
    Secondary,
}

impl InputSlot {
    /// Processing order. Earlier slots win same-frame conflicts.
    pub const ALL: [InputSlot; 2] = [InputSlot::Primary, InputSlot::Secondary];

    pub fn index(self) -> usize {
        match self {
            InputSlot::Primary => 0,
            InputSlot::Secondary => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Controller,
    Hand,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceReport {
    Controller(ControllerReport),
    Hand(HandReport),
}

impl DeviceReport {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceReport::Controller(_) => DeviceKind::Controller,
            DeviceReport::Hand(_) => DeviceKind::Hand,
        }
    }
}

/// Device-agnostic view of one input source for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedInputSource {
    pub pose: Pose,
    /// Movement axes after the deadzone, magnitude at most 1.
    pub axes: Vec2f,
    pub select_pressed: bool,
}

pub trait NormalizeInput {
    type Report;

    fn normalize(&mut self, report: &Self::Report, config: &InputConfig) -> NormalizedInputSource;
}

#[derive(Debug)]
enum SourceAdapter {
    Controller(ControllerAdapter),
    Hand(HandAdapter),
}

impl SourceAdapter {
    fn for_kind(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Controller => SourceAdapter::Controller(ControllerAdapter),
            DeviceKind::Hand => SourceAdapter::Hand(HandAdapter::default()),
        }
    }

    fn kind(&self) -> DeviceKind {
        match self {
            SourceAdapter::Controller(_) => DeviceKind::Controller,
            SourceAdapter::Hand(_) => DeviceKind::Hand,
        }
    }

    fn normalize(&mut self, report: &DeviceReport, config: &InputConfig) -> Option<NormalizedInputSource> {
        match (self, report) {
            (SourceAdapter::Controller(adapter), DeviceReport::Controller(r)) => Some(adapter.normalize(r, config)),
            (SourceAdapter::Hand(adapter), DeviceReport::Hand(r)) => Some(adapter.normalize(r, config)),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct InputSource {
    slot: InputSlot,
    adapter: Option<SourceAdapter>,
    pose: Pose,
    axes: Vec2f,
    selecting: bool,
}

impl InputSource {
    fn new(slot: InputSlot) -> Self {
        Self {
            slot,
            adapter: None,
            pose: Pose::default(),
            axes: Vec2f::zeros(),
            selecting: false,
        }
    }

    pub fn slot(&self) -> InputSlot {
        self.slot
    }

    pub fn device_kind(&self) -> Option<DeviceKind> {
        self.adapter.as_ref().map(SourceAdapter::kind)
    }

    pub fn is_connected(&self) -> bool {
        self.adapter.is_some()
    }

    /// Target-ray pose in tracking space.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn axes(&self) -> Vec2f {
        self.axes
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    fn bind(&mut self, kind: DeviceKind) {
        self.adapter = Some(SourceAdapter::for_kind(kind));
        self.axes = Vec2f::zeros();
        self.selecting = false;
    }

    /// Back to the disconnected steady state.
    fn unbind(&mut self) {
        *self = Self::new(self.slot);
    }

    fn adapt(&mut self, report: &DeviceReport, config: &InputConfig) -> Option<NormalizedInputSource> {
        let adapter = self.adapter.as_mut()?;
        if adapter.kind() != report.kind() {
            debug!("{:?} switched to {:?}", self.slot, report.kind());
            *adapter = SourceAdapter::for_kind(report.kind());
        }
        adapter.normalize(report, config)
    }
}

#[derive(Debug)]
pub struct InputSources([InputSource; 2]);

impl Default for InputSources {
    fn default() -> Self {
        Self([InputSource::new(InputSlot::Primary), InputSource::new(InputSlot::Secondary)])
    }
}

impl InputSources {
    pub fn get(&self, slot: InputSlot) -> &InputSource {
        &self.0[slot.index()]
    }

    fn get_mut(&mut self, slot: InputSlot) -> &mut InputSource {
        &mut self.0[slot.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputSource> {
        self.0.iter()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Applies connection changes, then reads every bound slot's report.
/// Returns the frame's input events: connection changes first, then
/// selection edges in slot order.
pub fn poll_input_sources(
    ctx: &mut FrameContext,
    device_events: &[DeviceEvent],
    frame: &FrameInput,
    config: &InputConfig,
) -> Vec<InputEvent> {
    let mut events = Vec::new();

    for event in device_events {
        match *event {
            DeviceEvent::Connected { slot, kind } => {
                let source = ctx.sources.get_mut(slot);
                if source.device_kind() == Some(kind) {
                    continue;
                }
                if source.is_connected() {
                    source.unbind();
                    events.push(InputEvent::Disconnected { slot });
                }
                source.bind(kind);
                info!("{:?} input connected: {:?}", slot, kind);
                events.push(InputEvent::Connected { slot, kind });
            }
            DeviceEvent::Disconnected { slot } => {
                let source = ctx.sources.get_mut(slot);
                if source.is_connected() {
                    source.unbind();
                    info!("{:?} input disconnected", slot);
                    events.push(InputEvent::Disconnected { slot });
                }
            }
        }
    }

    for slot in InputSlot::ALL {
        let source = ctx.sources.get_mut(slot);
        if !source.is_connected() {
            continue;
        }
        let normalized = frame.report(slot).and_then(|report| source.adapt(report, config));
        let Some(normalized) = normalized else {
            // Tracking lost for this frame: hold the pose, stop moving.
            source.axes = Vec2f::zeros();
            continue;
        };

        source.pose = normalized.pose;
        source.axes = normalized.axes;
        if normalized.select_pressed != source.selecting {
            source.selecting = normalized.select_pressed;
            events.push(if normalized.select_pressed {
                InputEvent::SelectStart { slot }
            } else {
                InputEvent::SelectEnd { slot }
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::math::Vec3f;

    fn controller(thumbstick: Vec2f, trigger_pressed: bool) -> Option<DeviceReport> {
        Some(DeviceReport::Controller(ControllerReport {
            pose: Pose::from_position(Vec3f::new(0.0, 1.0, 0.0)),
            thumbstick,
            trigger_pressed,
        }))
    }

    fn frame(primary: Option<DeviceReport>, secondary: Option<DeviceReport>) -> FrameInput {
        FrameInput {
            head: None,
            devices: [primary, secondary],
        }
    }

    fn connected(slot: InputSlot, kind: DeviceKind) -> DeviceEvent {
        DeviceEvent::Connected { slot, kind }
    }

    #[test]
    fn unbound_slots_report_nothing() {
        let mut ctx = FrameContext::default();
        let config = ViewerConfig::default().input;
        let events = poll_input_sources(
            &mut ctx,
            &[],
            &frame(controller(Vec2f::new(1.0, 0.0), true), None),
            &config,
        );
        assert!(events.is_empty());
        let primary = ctx.sources.get(InputSlot::Primary);
        assert!(!primary.is_connected());
        assert_eq!(primary.axes(), Vec2f::zeros());
        assert!(!primary.is_selecting());
    }

    #[test]
    fn selection_is_edge_triggered() {
        let mut ctx = FrameContext::default();
        let config = ViewerConfig::default().input;
        let connect = [connected(InputSlot::Primary, DeviceKind::Controller)];

        let events = poll_input_sources(&mut ctx, &connect, &frame(controller(Vec2f::zeros(), true), None), &config);
        assert_eq!(
            events,
            vec![
                InputEvent::Connected {
                    slot: InputSlot::Primary,
                    kind: DeviceKind::Controller
                },
                InputEvent::SelectStart { slot: InputSlot::Primary },
            ]
        );

        // Held for several frames: no further edges.
        for _ in 0..3 {
            let held = poll_input_sources(&mut ctx, &[], &frame(controller(Vec2f::zeros(), true), None), &config);
            assert!(held.is_empty());
        }

        let released = poll_input_sources(&mut ctx, &[], &frame(controller(Vec2f::zeros(), false), None), &config);
        assert_eq!(released, vec![InputEvent::SelectEnd { slot: InputSlot::Primary }]);
    }

    #[test]
    fn axes_pass_through_deadzone() {
        let mut ctx = FrameContext::default();
        let config = ViewerConfig::default().input;
        let connect = [connected(InputSlot::Primary, DeviceKind::Controller)];
        poll_input_sources(&mut ctx, &connect, &frame(controller(Vec2f::new(0.05, -0.8), false), None), &config);
        assert_eq!(ctx.sources.get(InputSlot::Primary).axes(), Vec2f::new(0.0, -0.8));
    }

    #[test]
    fn disconnect_resets_the_slot() {
        let mut ctx = FrameContext::default();
        let config = ViewerConfig::default().input;
        let connect = [connected(InputSlot::Secondary, DeviceKind::Controller)];
        poll_input_sources(&mut ctx, &connect, &frame(None, controller(Vec2f::new(0.5, 0.5), true)), &config);

        let events = poll_input_sources(
            &mut ctx,
            &[DeviceEvent::Disconnected { slot: InputSlot::Secondary }],
            &frame(None, None),
            &config,
        );
        assert_eq!(events, vec![InputEvent::Disconnected { slot: InputSlot::Secondary }]);
        let secondary = ctx.sources.get(InputSlot::Secondary);
        assert!(!secondary.is_connected());
        assert!(!secondary.is_selecting());
        assert_eq!(secondary.axes(), Vec2f::zeros());
    }

    #[test]
    fn missing_report_stops_movement_but_keeps_binding() {
        let mut ctx = FrameContext::default();
        let config = ViewerConfig::default().input;
        let connect = [connected(InputSlot::Primary, DeviceKind::Controller)];
        poll_input_sources(&mut ctx, &connect, &frame(controller(Vec2f::new(0.0, -1.0), false), None), &config);
        poll_input_sources(&mut ctx, &[], &frame(None, None), &config);
        let primary = ctx.sources.get(InputSlot::Primary);
        assert!(primary.is_connected());
        assert_eq!(primary.axes(), Vec2f::zeros());
    }

    #[test]
    fn hand_and_controller_produce_the_same_signal() {
        let mut ctx = FrameContext::default();
        let config = ViewerConfig::default().input;
        let connect = [
            connected(InputSlot::Primary, DeviceKind::Controller),
            connected(InputSlot::Secondary, DeviceKind::Hand),
        ];
        let pinch = Some(DeviceReport::Hand(HandReport {
            pose: Pose::default(),
            thumb_tip: Vec3f::zeros(),
            index_tip: Vec3f::new(0.01, 0.0, 0.0),
        }));
        let events = poll_input_sources(&mut ctx, &connect, &frame(controller(Vec2f::zeros(), true), pinch), &config);
        let selects: Vec<_> = events
            .into_iter()
            .filter(|e| matches!(e, InputEvent::SelectStart { .. }))
            .collect();
        assert_eq!(
            selects,
            vec![
                InputEvent::SelectStart { slot: InputSlot::Primary },
                InputEvent::SelectStart { slot: InputSlot::Secondary },
            ]
        );
    }

    #[test]
    fn reconnecting_a_different_device_replaces_the_binding() {
        let mut ctx = FrameContext::default();
        let config = ViewerConfig::default().input;
        poll_input_sources(&mut ctx, &[connected(InputSlot::Primary, DeviceKind::Controller)], &frame(None, None), &config);
        let events = poll_input_sources(&mut ctx, &[connected(InputSlot::Primary, DeviceKind::Hand)], &frame(None, None), &config);
        assert_eq!(
            events,
            vec![
                InputEvent::Disconnected { slot: InputSlot::Primary },
                InputEvent::Connected {
                    slot: InputSlot::Primary,
                    kind: DeviceKind::Hand
                },
            ]
        );
        assert_eq!(ctx.sources.get(InputSlot::Primary).device_kind(), Some(DeviceKind::Hand));
    }
}
