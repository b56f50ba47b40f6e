//! Asset loading/parsers (scenes, materials, textures).
//! OBJ scenes are split into material runs; MTL libraries resolve relative to the scene.
//! Textures decode to RGBA8 with a CPU-built mip chain.

pub mod bounds;
pub mod material;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod paths;
pub mod text;
pub mod texture;

pub use bounds::Bounds;
pub use material::{MaterialProperties, TextureNames, TextureSlot};
pub use mesh::{MeshGroup, SceneData, Vertex};
pub use texture::TextureData;
