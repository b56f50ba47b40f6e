//! Core types: math re-exports, Transform, Camera.

pub use glam::{Mat4, Vec3, Vec4, vec3};

pub mod camera;
pub mod transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn normalizing_scale_inverts_extent() {
        let t = transform::Transform::normalizing(4.0);
        let m = t.matrix().to_cols_array();
        assert!((m[0] - 0.25).abs() < 1e-6);
        assert!((m[5] - 0.25).abs() < 1e-6);
        assert!((m[10] - 0.25).abs() < 1e-6);
        assert_eq!(m[15], 1.0);
    }

    #[test]
    fn degenerate_extent_keeps_unit_scale() {
        assert_eq!(transform::Transform::normalizing(0.0).scale, 1.0);
        assert_eq!(transform::Transform::normalizing(f32::NAN).scale, 1.0);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::viewer(16.0 / 9.0);
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn origin_projects_inside_depth_range() {
        let cam = camera::Camera::viewer(1.0);
        let clip = cam.proj_view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc_z = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&ndc_z));
    }
}
