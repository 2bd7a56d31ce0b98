use crate::config::InputConfig;
use crate::input::{NormalizeInput, NormalizedInputSource};
use crate::math::{Pose, Vec2f, Vec3f};

/// Raw state of a tracked hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandReport {
    /// Target-ray pose.
    pub pose: Pose,
    pub thumb_tip: Vec3f,
    pub index_tip: Vec3f,
}

impl HandReport {
    pub fn pinch_distance(&self) -> f32 {
        (self.thumb_tip - self.index_tip).norm()
    }
}

/// Turns a pinch into selection. Hands have no stick, so axes stay zero.
#[derive(Debug, Default)]
pub struct HandAdapter {
    pinching: bool,
}

impl NormalizeInput for HandAdapter {
    type Report = HandReport;

    fn normalize(&mut self, report: &HandReport, config: &InputConfig) -> NormalizedInputSource {
        let distance = report.pinch_distance();
        if self.pinching {
            self.pinching = distance < config.pinch_end_distance;
        } else {
            self.pinching = distance < config.pinch_start_distance;
        }
        NormalizedInputSource {
            pose: report.pose,
            axes: Vec2f::zeros(),
            select_pressed: self.pinching,
        }
    }
}
