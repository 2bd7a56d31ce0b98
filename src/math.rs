#![allow(dead_code)]

use rapier3d::na;

// Type defs for convenience
// Makes it easier to switch the maths library

// Float specializations
pub type Vec2f = na::Vector2<f32>;
pub type Vec3f = na::Vector3<f32>;
pub type Point3f = na::Point3<f32>;
pub type Mat4f = na::Matrix4<f32>;
pub type UnitQuatf = na::UnitQuaternion<f32>;
pub type Isometry3f = na::Isometry3<f32>;

// Generic
pub type Quat<T> = na::Quaternion<T>;
pub type UnitQuat<T> = na::UnitQuaternion<T>;

/// Position + orientation as reported by a tracked device or the headset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3f,
    pub orientation: UnitQuatf,
}

impl Pose {
    pub fn new(position: Vec3f, orientation: UnitQuatf) -> Self {
        Self { position, orientation }
    }

    pub fn from_position(position: Vec3f) -> Self {
        Self::new(position, UnitQuat::identity())
    }

    /// Local -Z axis in world space.
    pub fn forward(&self) -> Vec3f {
        self.orientation * -Vec3f::z()
    }

    pub fn translated(&self, offset: Vec3f) -> Self {
        Self::new(self.position + offset, self.orientation)
    }

    pub fn isometry(&self) -> Isometry3f {
        Isometry3f::from_parts(na::Translation3::from(self.position), self.orientation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::from_position(Vec3f::zeros())
    }
}

pub fn color_from_hex(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    [channel(16), channel(8), channel(0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pose_faces_negative_z() {
        let pose = Pose::default();
        assert!((pose.forward() - Vec3f::new(0.0, 0.0, -1.0)).norm() < 1e-6);
    }

    #[test]
    fn yawed_pose_forward_follows_rotation() {
        let pose = Pose::new(
            Vec3f::zeros(),
            UnitQuat::from_axis_angle(&Vec3f::y_axis(), std::f32::consts::FRAC_PI_2),
        );
        // +90 degrees about Y turns -Z into -X
        assert!((pose.forward() - Vec3f::new(-1.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn hex_colors_split_into_channels() {
        let c = color_from_hex(0x00D4FF);
        assert_eq!(c[0], 0.0);
        assert!((c[1] - 212.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[2], 1.0);
    }
}
