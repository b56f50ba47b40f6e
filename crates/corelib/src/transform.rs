use crate::{Mat4, Vec3};

/// Per-mesh model transform. Only uniform scaling is supported.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: f32,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self { scale: 1.0 }
    }

    /// Scale that maps a mesh with the given largest half-extent to unit size.
    /// Degenerate (zero or non-finite) extents keep the mesh unscaled.
    pub fn normalizing(max_half_extent: f32) -> Self {
        if max_half_extent.is_finite() && max_half_extent > f32::EPSILON {
            Self {
                scale: 1.0 / max_half_extent,
            }
        } else {
            Self::identity()
        }
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.scale))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
