use rapier3d::na;

use crate::math::{Isometry3f, Mat4f, UnitQuat, UnitQuatf, Vec3f};

/// Placement of the model or the desktop camera. Mesh data is already
/// normalized, so there is no scale component.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pos: Vec3f,
    rot: UnitQuatf,
    // Cached transform matrix
    m: Mat4f,
}

impl Transform {
    pub fn new(pos: Vec3f, rot: UnitQuatf) -> Self {
        let mut res = Self { pos, rot, m: Mat4f::identity() };
        res.rebuild_matrix();
        res
    }

    pub fn from_position(pos: Vec3f) -> Self {
        Transform::new(pos, UnitQuat::identity())
    }

    // Getters

    pub fn matrix(&self) -> Mat4f {
        self.m
    }

    pub fn forward(&self) -> Vec3f {
        -self.m.column(2).xyz()
    }

    pub fn right(&self) -> Vec3f {
        self.m.column(0).xyz()
    }

    pub fn up(&self) -> Vec3f {
        self.m.column(1).xyz()
    }

    pub fn position(&self) -> Vec3f {
        self.pos
    }

    pub fn rotation(&self) -> UnitQuatf {
        self.rot
    }

    pub fn isometry(&self) -> Isometry3f {
        Isometry3f::from_parts(na::Translation3::from(self.pos), self.rot)
    }

    // Setters

    pub fn look_at(&mut self, target: Vec3f) {
        let dir = target - self.pos;
        if dir.norm_squared() > f32::EPSILON {
            // face_towards points +Z at the target; the camera looks down -Z.
            self.rot = UnitQuat::face_towards(&-dir, &Vec3f::y());
            self.rebuild_matrix();
        }
    }

    pub fn set_position(&mut self, pos: Vec3f) {
        self.pos = pos;
        self.rebuild_matrix();
    }

    pub fn set_pose(&mut self, pos: Vec3f, rot: UnitQuatf) {
        self.pos = pos;
        self.rot = rot;
        self.rebuild_matrix();
    }

    pub fn set_isometry(&mut self, iso: &Isometry3f) {
        self.set_pose(iso.translation.vector, iso.rotation);
    }

    // Rotate around the given global `axis` by `angle` (in radians).
    #[inline]
    pub fn rotate_axis(&mut self, axis: &na::Unit<Vec3f>, angle: f32) {
        self.rot = UnitQuat::from_axis_angle(axis, angle) * self.rot;
        self.rebuild_matrix();
    }

    fn rebuild_matrix(&mut self) {
        self.m = self.isometry().to_homogeneous();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::from_position(Vec3f::zeros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3f, b: Vec3f) -> bool {
        (a - b).norm() < 1e-5
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut camera = Transform::from_position(Vec3f::new(0.0, 1.6, 3.0));
        let target = Vec3f::new(0.0, 1.0, 0.0);
        camera.look_at(target);
        let expected = (target - camera.position()).normalize();
        assert!(close(camera.forward(), expected));
    }

    #[test]
    fn rotation_keeps_matrix_in_sync() {
        let mut t = Transform::from_position(Vec3f::new(1.0, 2.0, 0.0));
        t.rotate_axis(&Vec3f::y_axis(), 0.3);
        let rebuilt = Transform::new(t.position(), t.rotation());
        assert!((t.matrix() - rebuilt.matrix()).norm() < 1e-5);
        assert!(close(t.matrix().column(3).xyz(), Vec3f::new(1.0, 2.0, 0.0)));
    }
}
