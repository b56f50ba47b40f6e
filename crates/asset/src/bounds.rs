//! Axis-aligned bounding boxes over vertex lists.

use crate::mesh::Vertex;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    /// Bounds of `vertices`. An empty list yields both corners at the origin.
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        let Some(first) = vertices.first() else {
            return Self::default();
        };

        vertices[1..].iter().fold(
            Self {
                min: first.position,
                max: first.position,
            },
            |mut acc, v| {
                for axis in 0..3 {
                    acc.min[axis] = acc.min[axis].min(v.position[axis]);
                    acc.max[axis] = acc.max[axis].max(v.position[axis]);
                }
                acc
            },
        )
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(other.min[axis]);
            out.max[axis] = out.max[axis].max(other.max[axis]);
        }
        out
    }

    pub fn extent(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Largest half-extent over the three axes; 0 for a point.
    pub fn max_half_extent(&self) -> f32 {
        let [x, y, z] = self.extent();
        0.5 * x.max(y).max(z)
    }
}
