//! Scene file to GPU-resident asset.
//!
//! Parsing, texture resolution, buffer building and bounds all happen here in
//! one synchronous pass on the thread that owns the device. Every failure is
//! recovered at this boundary: [`load_asset`] returns the empty sentinel,
//! [`try_load_asset`] reports why.

use std::path::{Path, PathBuf};

use asset::{Bounds, MaterialProperties, SceneData, paths};
use thiserror::Error;

use crate::{
    buffers::{BuildError, build_group_buffers},
    gpu::{FilterMode, GpuDevice, GpuError, TextureKind},
    lifecycle,
    loaded::{DrawGroup, LoadedAsset},
    texture_cache::cache_key,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("scene file '{0}' not found")]
    NotFound(PathBuf),
    #[error("failed to parse '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("'{0}' contains no usable triangles")]
    NoTriangles(PathBuf),
    #[error("no resident asset at index {index} ({len} loaded)")]
    InvalidIndex { index: usize, len: usize },
    #[error("GPU resource creation failed for '{path}': {source}")]
    Gpu {
        path: PathBuf,
        #[source]
        source: GpuError,
    },
}

/// Load `path`, returning an empty asset if anything fails.
pub fn load_asset<D: GpuDevice + ?Sized>(
    device: &mut D,
    path: &Path,
    filter: FilterMode,
) -> LoadedAsset {
    match try_load_asset(device, path, filter) {
        Ok(asset) => asset,
        Err(err) => {
            log::error!("{}", err);
            LoadedAsset::empty(path)
        }
    }
}

/// Load `path` into a fully built asset. No GPU handle outlives a failure.
pub fn try_load_asset<D: GpuDevice + ?Sized>(
    device: &mut D,
    path: &Path,
    filter: FilterMode,
) -> Result<LoadedAsset, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let scene = asset::obj::load_obj_from_path(path).map_err(|err| LoadError::Parse {
        path: path.to_path_buf(),
        reason: format!("{:#}", err),
    })?;
    if !scene.is_valid() {
        return Err(LoadError::NoTriangles(path.to_path_buf()));
    }

    let mut loaded = LoadedAsset::empty(path);
    if let Err(source) = populate(device, &mut loaded, &scene, &paths::base_dir(path), filter) {
        lifecycle::release(device, &mut loaded);
        return Err(LoadError::Gpu {
            path: path.to_path_buf(),
            source,
        });
    }

    log::info!(
        "Loaded '{}': {} groups, {} triangles, {} materials, {} textures",
        path.display(),
        loaded.groups.len(),
        loaded.triangle_count(),
        scene.materials.len(),
        loaded.textures.len()
    );
    Ok(loaded)
}

fn populate<D: GpuDevice + ?Sized>(
    device: &mut D,
    loaded: &mut LoadedAsset,
    scene: &SceneData,
    base: &Path,
    filter: FilterMode,
) -> Result<(), GpuError> {
    let label = loaded.source.display().to_string();

    for (index, mesh) in scene.groups.iter().enumerate() {
        let material = scene
            .material(mesh.material_id)
            .cloned()
            .unwrap_or_else(MaterialProperties::default);

        let mut group = DrawGroup::new(
            mesh.triangle_count() as u32,
            mesh.material_id,
            material,
            Bounds::from_vertices(&mesh.vertices),
        );

        for (slot, name) in group.material.textures.iter() {
            let texture_path = paths::resolve(base, name);
            let kind = TextureKind::for_slot(slot);
            if loaded
                .textures
                .resolve(device, &texture_path, kind, filter)?
                .is_some()
            {
                group.textures.set(slot, Some(cache_key(&texture_path, kind)));
            }
        }

        let group_label = format!("{} #{}", label, index);
        match build_group_buffers(device, &group_label, &mut group, &mesh.vertices) {
            Ok(_) => {}
            Err(BuildError::Gpu(err)) => return Err(err),
            Err(err) => {
                // The parser only emits whole triangles, so this is a logic error; skip the group.
                log::error!("Group '{}' not built: {}", group_label, err);
                continue;
            }
        }
        loaded.groups.push(group);
    }

    Ok(())
}
