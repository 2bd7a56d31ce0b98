use crate::config::InputConfig;
use crate::input::{NormalizeInput, NormalizedInputSource};
use crate::math::{Pose, Vec2f};

/// Raw state of a thumbstick controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerReport {
    /// Target-ray pose.
    pub pose: Pose,
    /// Thumbstick x (right positive) and y (down positive).
    pub thumbstick: Vec2f,
    pub trigger_pressed: bool,
}

pub fn apply_deadzone(axes: Vec2f, deadzone: f32) -> Vec2f {
    let filtered = axes.map(|v| if v.abs() < deadzone { 0.0 } else { v });
    let magnitude = filtered.norm();
    if magnitude > 1.0 {
        filtered / magnitude
    } else {
        filtered
    }
}

#[derive(Debug, Default)]
pub struct ControllerAdapter;

impl NormalizeInput for ControllerAdapter {
    type Report = ControllerReport;

    fn normalize(&mut self, report: &ControllerReport, config: &InputConfig) -> NormalizedInputSource {
        NormalizedInputSource {
            pose: report.pose,
            axes: apply_deadzone(report.thumbstick, config.deadzone),
            select_pressed: report.trigger_pressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_deflections_are_suppressed_per_axis() {
        let axes = apply_deadzone(Vec2f::new(0.05, -0.6), 0.1);
        assert_eq!(axes, Vec2f::new(0.0, -0.6));
    }

    #[test]
    fn diagonal_overshoot_is_clamped_to_unit_length() {
        let axes = apply_deadzone(Vec2f::new(1.0, 1.0), 0.1);
        assert!((axes.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn trigger_maps_to_selection() {
        let report = ControllerReport {
            pose: Pose::default(),
            thumbstick: Vec2f::new(0.0, -1.0),
            trigger_pressed: true,
        };
        let normalized = ControllerAdapter.normalize(&report, &crate::config::ViewerConfig::default().input);
        assert!(normalized.select_pressed);
        assert_eq!(normalized.axes, Vec2f::new(0.0, -1.0));
    }
}
