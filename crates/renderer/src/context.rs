//! Application context: the resident asset collection plus the render settings
//! the draw path needs. Replaces process-wide statics.

use std::path::{Path, PathBuf};

use asset::Bounds;
use corelib::{camera::Camera, transform::Transform};

use crate::{
    draw::{DrawSink, DrawTransform, FaceMode, RasterMode, draw_asset},
    gpu::{FilterMode, GpuDevice, GpuError},
    ingest::{LoadError, try_load_asset},
    lifecycle,
    loaded::LoadedAsset,
};

/// Which bounds scale an asset to unit size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Normalization {
    /// Bounds of the first draw group only.
    #[default]
    FirstGroup,
    /// Union of every group's bounds.
    Union,
}

impl Normalization {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "first-group" | "first" => Some(Self::FirstGroup),
            "union" | "all" => Some(Self::Union),
            _ => None,
        }
    }

    pub fn bounds(self, asset: &LoadedAsset) -> Option<Bounds> {
        match self {
            Normalization::FirstGroup => asset.first_group_bounds(),
            Normalization::Union => asset.bounds(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSettings {
    pub raster: RasterMode,
    pub face: FaceMode,
    pub filter: FilterMode,
    pub normalization: Normalization,
}

/// Outcome of one import call.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub loaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, LoadError)>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ViewerContext {
    assets: Vec<LoadedAsset>,
    settings: RenderSettings,
}

impl ViewerContext {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            assets: Vec::new(),
            settings,
        }
    }

    pub fn assets(&self) -> &[LoadedAsset] {
        &self.assets
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    pub fn set_raster_mode(&mut self, raster: RasterMode) {
        self.settings.raster = raster;
    }

    pub fn set_face_mode(&mut self, face: FaceMode) {
        self.settings.face = face;
    }

    pub fn set_normalization(&mut self, normalization: Normalization) {
        self.settings.normalization = normalization;
    }

    /// Load each path independently; a failure never aborts the others.
    pub fn import<D, I, P>(&mut self, device: &mut D, paths: I) -> ImportReport
    where
        D: GpuDevice + ?Sized,
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = ImportReport::default();
        for path in paths {
            let path = path.as_ref();
            match self.load(device, path) {
                Ok(_) => report.loaded.push(path.to_path_buf()),
                Err(err) => {
                    log::warn!("Import of '{}' failed: {}", path.display(), err);
                    report.failed.push((path.to_path_buf(), err));
                }
            }
        }
        report
    }

    /// Load one file and append it. Returns its index in the collection.
    pub fn load<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        path: &Path,
    ) -> Result<usize, LoadError> {
        let asset = try_load_asset(device, path, self.settings.filter)?;
        self.assets.push(asset);
        Ok(self.assets.len() - 1)
    }

    /// Replace the asset at `index` with a fresh load of `path`.
    /// The old asset is released only once the new one loaded successfully.
    pub fn replace<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        index: usize,
        path: &Path,
    ) -> Result<(), LoadError> {
        if index >= self.assets.len() {
            return Err(LoadError::InvalidIndex {
                index,
                len: self.assets.len(),
            });
        }
        let fresh = try_load_asset(device, path, self.settings.filter)?;
        let mut old = std::mem::replace(&mut self.assets[index], fresh);
        lifecycle::release(device, &mut old);
        Ok(())
    }

    /// Release and remove the asset at `index`. Returns `false` if out of range.
    pub fn evict<D: GpuDevice + ?Sized>(&mut self, device: &mut D, index: usize) -> bool {
        if index >= self.assets.len() {
            return false;
        }
        let mut asset = self.assets.remove(index);
        lifecycle::release(device, &mut asset);
        true
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.settings.filter
    }

    /// Change the global filtering policy and apply it to every resident texture.
    pub fn set_filter_mode<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        filter: FilterMode,
    ) -> Result<(), GpuError> {
        self.settings.filter = filter;
        for asset in &self.assets {
            asset.textures().apply_filter(device, filter)?;
        }
        log::info!("Texture filtering set to {:?}", filter);
        Ok(())
    }

    /// Model transform normalizing `asset` to unit half-extent.
    pub fn model_transform(&self, asset: &LoadedAsset) -> Transform {
        self.settings
            .normalization
            .bounds(asset)
            .map(|b| Transform::normalizing(b.max_half_extent()))
            .unwrap_or_default()
    }

    /// Draw every resident asset. Returns the number of draw calls issued.
    pub fn draw<S: DrawSink + ?Sized>(&self, sink: &mut S, camera: &Camera) -> usize {
        let view_proj = camera.proj_view();
        self.assets
            .iter()
            .map(|asset| {
                let transform = DrawTransform {
                    model: self.model_transform(asset).matrix(),
                    view_proj,
                    eye: camera.eye,
                };
                draw_asset(
                    asset,
                    self.settings.face,
                    self.settings.raster,
                    &transform,
                    sink,
                )
            })
            .sum()
    }

    /// Release every resident asset. Safe to call more than once.
    pub fn shutdown<D: GpuDevice + ?Sized>(&mut self, device: &mut D) {
        for asset in &mut self.assets {
            lifecycle::release(device, asset);
        }
        self.assets.clear();
    }
}
