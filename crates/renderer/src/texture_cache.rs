//! Per-asset texture cache keyed by resolved file path and texel kind.

use std::{collections::HashMap, path::Path};

use asset::TextureData;

use crate::gpu::{FilterMode, GpuDevice, GpuError, TextureHandle, TextureKind};

/// Textures owned by one loaded asset. Never shared between assets.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<String, TextureHandle>,
}

/// Cache key of a texture path. The same file used as color and as data is
/// uploaded twice, once per format.
pub fn cache_key(path: &Path, kind: TextureKind) -> String {
    let key = path.to_string_lossy().replace('\\', "/");
    match kind {
        TextureKind::Color => key,
        TextureKind::Data => format!("{key}#linear"),
    }
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `path`, decoding and uploading it on first use.
    ///
    /// A file that cannot be decoded yields `Ok(None)`; the caller falls back to
    /// flat material color. Only GPU creation failures are errors.
    pub fn resolve<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        path: &Path,
        kind: TextureKind,
        filter: FilterMode,
    ) -> Result<Option<TextureHandle>, GpuError> {
        let key = cache_key(path, kind);
        if let Some(&handle) = self.entries.get(&key) {
            return Ok(Some(handle));
        }

        let levels = match TextureData::load(path).and_then(|tex| tex.mip_chain()) {
            Ok(levels) => levels,
            Err(err) => {
                log::warn!("Texture '{}' skipped: {:#}", key, err);
                return Ok(None);
            }
        };

        let handle = device.create_texture(&key, &levels, kind, filter)?;
        log::debug!(
            "Texture '{}' uploaded as {:?} with {} mip levels",
            key,
            handle,
            levels.len()
        );
        self.entries.insert(key, handle);
        Ok(Some(handle))
    }

    pub fn get(&self, key: &str) -> Option<TextureHandle> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.entries.values().copied()
    }

    /// Re-apply `filter` to every cached texture.
    pub fn apply_filter<D: GpuDevice + ?Sized>(
        &self,
        device: &mut D,
        filter: FilterMode,
    ) -> Result<(), GpuError> {
        for &handle in self.entries.values() {
            device.set_texture_filter(handle, filter)?;
        }
        Ok(())
    }

    /// Remove every entry, handing the handles to the caller for release.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (String, TextureHandle)> + '_ {
        self.entries.drain()
    }
}
