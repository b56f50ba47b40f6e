//! Test doubles: a GPU device that records handle traffic and a draw sink
//! that records commands. Neither touches a real GPU.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use asset::{TextureData, TextureSlot};

use crate::{
    draw::{DrawSink, DrawUniforms, FaceMode, RasterMode},
    gpu::{
        BufferHandle, FilterMode, GpuDevice, GpuError, LayoutHandle, TextureHandle, TextureKind,
        VertexLayout,
    },
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordedTexture {
    pub levels: usize,
    pub kind: TextureKind,
    pub filter: FilterMode,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub next_id: u32,
    /// Live buffers and their size in bytes.
    pub buffers: HashMap<BufferHandle, usize>,
    /// Live layouts and the buffer each one binds.
    pub layouts: HashMap<LayoutHandle, BufferHandle>,
    pub textures: HashMap<TextureHandle, RecordedTexture>,
    pub textures_created: usize,
    pub filter_updates: usize,
    pub double_frees: usize,
    pub fail_textures: bool,
    pub fail_layouts: bool,
    /// Number of further buffers that may be created; `None` is unlimited.
    pub buffer_budget: Option<usize>,
}

impl RecordingDevice {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// `true` when no handle is alive.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.layouts.is_empty() && self.textures.is_empty()
    }
}

impl GpuDevice for RecordingDevice {
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
    ) -> Result<BufferHandle, GpuError> {
        if let Some(budget) = self.buffer_budget.as_mut() {
            if *budget == 0 {
                return Err(GpuError::Allocation(format!("no budget left for '{label}'")));
            }
            *budget -= 1;
        }
        let handle = BufferHandle(self.next());
        self.buffers.insert(handle, contents.len());
        Ok(handle)
    }

    fn create_vertex_layout(
        &mut self,
        buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> Result<LayoutHandle, GpuError> {
        if self.fail_layouts {
            return Err(GpuError::LayoutMismatch(format!("stride {}", layout.stride)));
        }
        if !self.buffers.contains_key(&buffer) {
            return Err(GpuError::UnknownHandle {
                kind: "buffer",
                id: buffer.0,
            });
        }
        let handle = LayoutHandle(self.next());
        self.layouts.insert(handle, buffer);
        Ok(handle)
    }

    fn create_texture(
        &mut self,
        label: &str,
        levels: &[TextureData],
        kind: TextureKind,
        filter: FilterMode,
    ) -> Result<TextureHandle, GpuError> {
        if self.fail_textures {
            return Err(GpuError::Allocation(label.to_string()));
        }
        let handle = TextureHandle(self.next());
        self.textures.insert(
            handle,
            RecordedTexture {
                levels: levels.len(),
                kind,
                filter,
            },
        );
        self.textures_created += 1;
        Ok(handle)
    }

    fn set_texture_filter(
        &mut self,
        texture: TextureHandle,
        filter: FilterMode,
    ) -> Result<(), GpuError> {
        let entry = self
            .textures
            .get_mut(&texture)
            .ok_or(GpuError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
        entry.filter = filter;
        self.filter_updates += 1;
        Ok(())
    }

    fn destroy_vertex_layout(&mut self, layout: LayoutHandle) {
        if self.layouts.remove(&layout).is_none() {
            self.double_frees += 1;
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.layouts.values().any(|b| *b == buffer) {
            panic!("buffer {buffer:?} destroyed while a layout still references it");
        }
        if self.buffers.remove(&buffer).is_none() {
            self.double_frees += 1;
        }
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            self.double_frees += 1;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SinkCall {
    Raster(FaceMode, RasterMode),
    BindTexture(TextureSlot, TextureHandle),
    UnbindTextures,
    Uniforms(DrawUniforms),
    Layout(LayoutHandle),
    Draw(u32),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn uniforms(&self) -> Vec<DrawUniforms> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::Uniforms(u) => Some(*u),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SinkCall::Draw(_)))
            .count()
    }
}

impl DrawSink for RecordingSink {
    fn set_raster_state(&mut self, face: FaceMode, raster: RasterMode) {
        self.calls.push(SinkCall::Raster(face, raster));
    }

    fn bind_texture(&mut self, slot: TextureSlot, texture: TextureHandle) {
        self.calls.push(SinkCall::BindTexture(slot, texture));
    }

    fn unbind_textures(&mut self) {
        self.calls.push(SinkCall::UnbindTextures);
    }

    fn set_uniforms(&mut self, uniforms: &DrawUniforms) {
        self.calls.push(SinkCall::Uniforms(*uniforms));
    }

    fn bind_vertex_layout(&mut self, layout: LayoutHandle) {
        self.calls.push(SinkCall::Layout(layout));
    }

    fn draw_triangles(&mut self, vertex_count: u32) {
        self.calls.push(SinkCall::Draw(vertex_count));
    }
}

/// Fresh, empty fixture directory under the system temp dir.
pub fn fixture_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir()
        .join("svarog-viewer-tests")
        .join(format!("{}-{}-{}", name, std::process::id(), n));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create fixture dir");
    dir
}

/// Write a 4x4 single-color PNG and return its path.
pub fn write_png(dir: &Path, name: &str, rgba: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba(rgba));
    img.save(&path).expect("write png fixture");
    path
}
