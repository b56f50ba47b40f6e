//! Single teardown routine for every GPU handle an asset owns.

use crate::{gpu::GpuDevice, loaded::LoadedAsset};

/// Counts of handles handed back to the device by [`release`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReleaseStats {
    pub layouts: usize,
    pub buffers: usize,
    pub textures: usize,
}

impl ReleaseStats {
    pub fn total(&self) -> usize {
        self.layouts + self.buffers + self.textures
    }
}

/// Release the layouts, vertex buffers and textures owned by `asset`, then
/// clear it. Releasing an already released asset does nothing.
pub fn release<D: GpuDevice + ?Sized>(device: &mut D, asset: &mut LoadedAsset) -> ReleaseStats {
    let mut stats = ReleaseStats::default();

    for group in &mut asset.groups {
        if let Some(buffers) = group.gpu.take() {
            // Layout first: it references the buffer.
            device.destroy_vertex_layout(buffers.layout);
            device.destroy_buffer(buffers.buffer);
            stats.layouts += 1;
            stats.buffers += 1;
        }
    }
    asset.groups.clear();

    for (_, handle) in asset.textures.drain() {
        device.destroy_texture(handle);
        stats.textures += 1;
    }

    if stats.total() > 0 {
        log::info!(
            "Released '{}': {} buffers, {} layouts, {} textures",
            asset.source.display(),
            stats.buffers,
            stats.layouts,
            stats.textures
        );
    }
    stats
}

#[cfg(test)]
mod tests {
    use asset::{Bounds, MaterialProperties, Vertex};

    use super::*;
    use crate::{
        buffers::build_group_buffers,
        gpu::{FilterMode, TextureKind},
        loaded::DrawGroup,
        testing::{RecordingDevice, fixture_dir, write_png},
    };

    fn built_asset(device: &mut RecordingDevice) -> LoadedAsset {
        let mut asset = LoadedAsset::empty("release.obj");
        let tri = vec![Vertex::default(); 3];
        for _ in 0..2 {
            let mut g = DrawGroup::new(1, None, MaterialProperties::default(), Bounds::default());
            build_group_buffers(device, "g", &mut g, &tri).expect("build");
            asset.groups.push(g);
        }
        let dir = fixture_dir("lifecycle");
        let png = write_png(&dir, "t.png", [9, 9, 9, 255]);
        asset
            .textures
            .resolve(device, &png, TextureKind::Color, FilterMode::Bilinear)
            .expect("gpu ok")
            .expect("decoded");
        asset
    }

    #[test]
    fn release_frees_everything_once() {
        let mut device = RecordingDevice::default();
        let mut asset = built_asset(&mut device);
        assert!(asset.holds_gpu_resources());

        let stats = release(&mut device, &mut asset);
        assert_eq!(
            stats,
            ReleaseStats {
                layouts: 2,
                buffers: 2,
                textures: 1
            }
        );
        assert!(device.is_empty());
        assert!(asset.is_empty());
        assert!(!asset.holds_gpu_resources());
    }

    #[test]
    fn second_release_is_noop() {
        let mut device = RecordingDevice::default();
        let mut asset = built_asset(&mut device);
        release(&mut device, &mut asset);
        let again = release(&mut device, &mut asset);
        assert_eq!(again.total(), 0);
        assert_eq!(device.double_frees, 0);
    }
}
