use bevy::math::{Mat4, Vec3};
use constants::reconstruction::VIEWPOINT_EPSILON;

/// Camera description for a single reconstruction cycle.
///
/// Reconstruction results are viewpoint dependent: a different viewpoint can
/// occlude different points or expose different local neighbourhoods, so the
/// normals are only as good as the single view used to compute them.
#[derive(Debug, Clone, Copy)]
pub struct Viewpoint {
    pub view: Mat4,
    pub projection: Mat4,
    pub near: f32,
    pub far: f32,
}

impl Viewpoint {
    pub fn new(view: Mat4, projection: Mat4, near: f32, far: f32) -> Self {
        Self {
            view,
            projection,
            near,
            far,
        }
    }

    /// Build a perspective viewpoint looking from `eye` towards `target`.
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh_gl(fov_y_degrees.to_radians(), aspect, near, far),
            near,
            far,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space camera position recovered from the view matrix.
    pub fn camera_position(&self) -> Vec3 {
        self.view.inverse().col(3).truncate()
    }

    /// Poll-for-dirty comparison used to decide whether a viewpoint changed.
    pub fn approx_eq(&self, other: &Viewpoint) -> bool {
        self.view.abs_diff_eq(other.view, VIEWPOINT_EPSILON)
            && self.projection.abs_diff_eq(other.projection, VIEWPOINT_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_position_round_trips_through_the_view_matrix() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let viewpoint = Viewpoint::perspective(eye, Vec3::ZERO, 45.0, 1.0, 0.1, 100.0);
        assert!(viewpoint.camera_position().abs_diff_eq(eye, 1e-4));
    }

    #[test]
    fn approx_eq_detects_movement() {
        let a = Viewpoint::perspective(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, 45.0, 1.0, 0.1, 100.0);
        let b = Viewpoint::perspective(Vec3::new(0.0, 0.1, 4.0), Vec3::ZERO, 45.0, 1.0, 0.1, 100.0);
        assert!(a.approx_eq(&a));
        assert!(!a.approx_eq(&b));
    }
}
