//! GPU-resident mesh data: draw groups and the assets that own them.

use std::path::{Path, PathBuf};

use asset::{Bounds, MaterialProperties, TextureSlot};

use crate::{
    gpu::{BufferHandle, LayoutHandle},
    texture_cache::TextureCache,
};

/// Vertex buffer and layout object of one draw group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupBuffers {
    pub buffer: BufferHandle,
    pub layout: LayoutHandle,
}

/// Per-slot keys into the owning asset's [`TextureCache`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupTextures {
    slots: [Option<String>; TextureSlot::COUNT],
}

impl GroupTextures {
    pub fn get(&self, slot: TextureSlot) -> Option<&str> {
        self.slots[slot.index()].as_deref()
    }

    pub fn set(&mut self, slot: TextureSlot, key: Option<String>) {
        self.slots[slot.index()] = key;
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureSlot, &str)> {
        TextureSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|key| (slot, key)))
    }
}

/// A material-homogeneous contiguous run of triangles, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawGroup {
    pub triangle_count: u32,
    pub material_id: Option<usize>,
    /// Copied in so the group is self-describing.
    pub material: MaterialProperties,
    pub bounds: Bounds,
    pub textures: GroupTextures,
    /// Set once by the buffer builder, cleared only by the lifecycle manager.
    pub gpu: Option<GroupBuffers>,
}

impl DrawGroup {
    pub fn new(
        triangle_count: u32,
        material_id: Option<usize>,
        material: MaterialProperties,
        bounds: Bounds,
    ) -> Self {
        Self {
            triangle_count,
            material_id,
            material,
            bounds,
            textures: GroupTextures::default(),
            gpu: None,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.triangle_count * 3
    }
}

/// One ingested file: its draw groups plus its private texture cache.
///
/// An asset without groups is the "load failed" sentinel.
#[derive(Debug)]
pub struct LoadedAsset {
    pub(crate) source: PathBuf,
    pub(crate) groups: Vec<DrawGroup>,
    pub(crate) textures: TextureCache,
}

impl LoadedAsset {
    pub fn empty(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            groups: Vec::new(),
            textures: TextureCache::new(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn groups(&self) -> &[DrawGroup] {
        &self.groups
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn triangle_count(&self) -> u32 {
        self.groups.iter().map(|g| g.triangle_count).sum()
    }

    /// Bounds of the first group, or `None` for an empty asset.
    pub fn first_group_bounds(&self) -> Option<Bounds> {
        self.groups.first().map(|g| g.bounds)
    }

    /// Union of all group bounds, or `None` for an empty asset.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut groups = self.groups.iter();
        let first = groups.next()?.bounds;
        Some(groups.fold(first, |acc, g| acc.union(&g.bounds)))
    }

    /// `true` while any GPU handle is still owned.
    pub fn holds_gpu_resources(&self) -> bool {
        !self.textures.is_empty() || self.groups.iter().any(|g| g.gpu.is_some())
    }
}

impl Drop for LoadedAsset {
    fn drop(&mut self) {
        if self.holds_gpu_resources() {
            log::warn!(
                "Asset '{}' dropped without release; its GPU handles are leaked",
                self.source.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_at(min: [f32; 3], max: [f32; 3]) -> DrawGroup {
        DrawGroup::new(1, None, MaterialProperties::default(), Bounds { min, max })
    }

    #[test]
    fn empty_asset_is_failed_sentinel() {
        let asset = LoadedAsset::empty("missing.obj");
        assert!(asset.is_empty());
        assert!(asset.bounds().is_none());
        assert!(!asset.holds_gpu_resources());
    }

    #[test]
    fn asset_bounds_union_and_first_group() {
        let mut asset = LoadedAsset::empty("two.obj");
        asset.groups.push(group_at([0.0; 3], [1.0; 3]));
        asset.groups.push(group_at([-3.0, 0.0, 0.0], [0.0, 2.0, 0.5]));

        let first = asset.first_group_bounds().expect("first");
        assert_eq!(first.max, [1.0; 3]);

        let all = asset.bounds().expect("union");
        assert_eq!(all.min, [-3.0, 0.0, 0.0]);
        assert_eq!(all.max, [1.0, 2.0, 1.0]);
        assert_eq!(asset.triangle_count(), 2);
    }

    #[test]
    fn group_textures_iterate_set_slots() {
        let mut tex = GroupTextures::default();
        tex.set(TextureSlot::Specular, Some("a/spec.png".into()));
        tex.set(TextureSlot::Ambient, Some("a/amb.png".into()));
        let set: Vec<_> = tex.iter().collect();
        assert_eq!(
            set,
            vec![
                (TextureSlot::Ambient, "a/amb.png"),
                (TextureSlot::Specular, "a/spec.png")
            ]
        );
    }
}
