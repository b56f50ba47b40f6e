//! CPU-side scene representation produced by the OBJ loader.

use crate::material::MaterialProperties;

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// A contiguous run of triangles sharing one material, in file order.
///
/// Vertices are expanded: every three consecutive entries form one triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGroup {
    pub material_id: Option<usize>,
    pub vertices: Vec<Vertex>,
}

impl MeshGroup {
    pub fn new(material_id: Option<usize>) -> Self {
        Self {
            material_id,
            vertices: Vec::new(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn push_triangle(&mut self, tri: [Vertex; 3]) {
        self.vertices.extend_from_slice(&tri);
    }
}

/// Everything parsed out of one scene file and its material libraries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneData {
    pub groups: Vec<MeshGroup>,
    pub materials: Vec<MaterialProperties>,
}

impl SceneData {
    /// Material for a group, if it has one and the index is known.
    pub fn material(&self, id: Option<usize>) -> Option<&MaterialProperties> {
        id.and_then(|i| self.materials.get(i))
    }

    pub fn triangle_count(&self) -> usize {
        self.groups.iter().map(MeshGroup::triangle_count).sum()
    }

    /// Returns `true` if at least one triangle was parsed.
    pub fn is_valid(&self) -> bool {
        self.triangle_count() > 0
    }
}
