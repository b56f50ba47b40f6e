//! wgpu implementation of the device seam plus the per-frame draw recorder.
//!
//! `WgpuDevice` owns every buffer and texture created through [`GpuDevice`]
//! in hash maps keyed by handle. wgpu has no vertex-array objects, so a layout
//! handle is a validated (buffer, layout) pairing resolved at draw time.

use std::collections::HashMap;

use asset::{TextureData, TextureSlot};
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, Buffer,
    BufferBinding, BufferBindingType, BufferSize, BufferUsages, Device, ErrorFilter, Extent3d,
    Origin3d, Queue, SamplerBindingType, SamplerDescriptor, ShaderStages, TexelCopyBufferLayout,
    TexelCopyTextureInfo, TextureAspect, TextureDescriptor, TextureDimension, TextureFormat,
    TextureSampleType, TextureUsages, TextureView, TextureViewDimension, util::DeviceExt,
};

use crate::{
    draw::{DrawSink, DrawUniforms, FaceMode, RasterMode},
    gpu::{
        BufferHandle, Filter, FilterMode, GpuDevice, GpuError, LayoutHandle, TextureHandle,
        TextureKind, VertexLayout,
    },
    vertex::GpuVertex,
};

pub const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

/// Storage format of a texture. Only color maps are decoded from sRGB when sampled.
pub fn texture_format(kind: TextureKind) -> TextureFormat {
    match kind {
        TextureKind::Color => TextureFormat::Rgba8UnormSrgb,
        TextureKind::Data => TextureFormat::Rgba8Unorm,
    }
}

/// Sampler settings for a filtering policy.
pub fn sampler_descriptor(label: Option<&str>, filter: FilterMode) -> SamplerDescriptor<'_> {
    let params = filter.sampler_params();
    let map = |f: Filter| match f {
        Filter::Nearest => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    };
    SamplerDescriptor {
        label,
        address_mode_u: AddressMode::Repeat,
        address_mode_v: AddressMode::Repeat,
        address_mode_w: AddressMode::ClampToEdge,
        mag_filter: map(params.mag),
        min_filter: map(params.min),
        mipmap_filter: params.mipmap.map(map).unwrap_or(wgpu::FilterMode::Nearest),
        lod_min_clamp: 0.0,
        // Base level only when the policy has no mip filter.
        lod_max_clamp: if params.mipmap.is_some() { 32.0 } else { 0.0 },
        anisotropy_clamp: params.anisotropy.max(1),
        ..Default::default()
    }
}

/// Layout of bind group 1: the per-draw uniform block followed by one
/// texture/sampler pair per material channel.
pub fn create_material_layout(device: &Device) -> BindGroupLayout {
    let mut entries = vec![BindGroupLayoutEntry {
        binding: 0,
        visibility: ShaderStages::VERTEX_FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: BufferSize::new(DRAW_UNIFORM_SIZE),
        },
        count: None,
    }];
    for slot in TextureSlot::ALL {
        let (texture, sampler) = slot_bindings(slot);
        entries.push(BindGroupLayoutEntry {
            binding: texture,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(BindGroupLayoutEntry {
            binding: sampler,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Sampler(SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Material BGL"),
        entries: &entries,
    })
}

/// (texture, sampler) binding indices of a slot inside bind group 1.
pub fn slot_bindings(slot: TextureSlot) -> (u32, u32) {
    let i = slot.index() as u32;
    (1 + 2 * i, 2 + 2 * i)
}

pub struct GpuTexture {
    texture: wgpu::Texture,
    view: TextureView,
    sampler: wgpu::Sampler,
}

pub struct WgpuDevice {
    device: Device,
    queue: Queue,
    next_id: u32,
    buffers: HashMap<BufferHandle, Buffer>,
    layouts: HashMap<LayoutHandle, BufferHandle>,
    textures: HashMap<TextureHandle, GpuTexture>,
    /// 1x1 white texture bound to every empty slot.
    fallback: GpuTexture,
}

impl WgpuDevice {
    pub fn new(device: Device, queue: Queue) -> Self {
        let fallback = upload_texture(
            &device,
            &queue,
            "Fallback texture",
            &[TextureData::solid([255, 255, 255, 255])],
            TextureKind::Color,
            FilterMode::Nearest,
        );
        Self {
            device,
            queue,
            next_id: 0,
            buffers: HashMap::new(),
            layouts: HashMap::new(),
            textures: HashMap::new(),
            fallback,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Vertex buffer a layout handle binds.
    pub fn layout_buffer(&self, layout: LayoutHandle) -> Option<&Buffer> {
        self.layouts
            .get(&layout)
            .and_then(|buffer| self.buffers.get(buffer))
    }

    pub fn live_counts(&self) -> (usize, usize, usize) {
        (self.buffers.len(), self.layouts.len(), self.textures.len())
    }

    /// Bind group 1 for one draw. Empty or unknown slots get the fallback texture.
    pub fn material_bind_group(
        &self,
        layout: &BindGroupLayout,
        uniforms: &Buffer,
        offset: u64,
        textures: &[Option<TextureHandle>; TextureSlot::COUNT],
    ) -> BindGroup {
        let mut entries = Vec::with_capacity(1 + 2 * TextureSlot::COUNT);
        entries.push(BindGroupEntry {
            binding: 0,
            resource: BindingResource::Buffer(BufferBinding {
                buffer: uniforms,
                offset,
                size: BufferSize::new(DRAW_UNIFORM_SIZE),
            }),
        });
        for slot in TextureSlot::ALL {
            let tex = textures[slot.index()]
                .and_then(|h| self.textures.get(&h))
                .unwrap_or(&self.fallback);
            let (texture, sampler) = slot_bindings(slot);
            entries.push(BindGroupEntry {
                binding: texture,
                resource: BindingResource::TextureView(&tex.view),
            });
            entries.push(BindGroupEntry {
                binding: sampler,
                resource: BindingResource::Sampler(&tex.sampler),
            });
        }
        self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("Material BG"),
            layout,
            entries: &entries,
        })
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    fn scoped<T>(&self, label: &str, f: impl FnOnce(&Device, &Queue) -> T) -> Result<T, GpuError> {
        self.device.push_error_scope(ErrorFilter::Validation);
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        let value = f(&self.device, &self.queue);
        let oom = pollster::block_on(self.device.pop_error_scope());
        let validation = pollster::block_on(self.device.pop_error_scope());
        match oom.or(validation) {
            Some(err) => Err(GpuError::Allocation(format!("{label}: {err}"))),
            None => Ok(value),
        }
    }
}

fn upload_texture(
    device: &Device,
    queue: &Queue,
    label: &str,
    levels: &[TextureData],
    kind: TextureKind,
    filter: FilterMode,
) -> GpuTexture {
    let base = &levels[0];
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: Extent3d {
            width: base.width,
            height: base.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: levels.len() as u32,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: texture_format(kind),
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    for (level, data) in levels.iter().enumerate() {
        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            &data.data,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.bytes_per_pixel() * data.width),
                rows_per_image: Some(data.height),
            },
            Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
        );
    }
    let view = texture.create_view(&Default::default());
    let sampler = device.create_sampler(&sampler_descriptor(Some(label), filter));
    GpuTexture {
        texture,
        view,
        sampler,
    }
}

impl GpuDevice for WgpuDevice {
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
    ) -> Result<BufferHandle, GpuError> {
        let limit = self.device.limits().max_buffer_size;
        let size = contents.len() as u64;
        if size > limit {
            return Err(GpuError::BufferTooLarge {
                label: label.to_string(),
                size,
                limit,
            });
        }
        let buffer = self.scoped(label, |device, _| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: BufferUsages::VERTEX,
            })
        })?;
        let handle = BufferHandle(self.next());
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn create_vertex_layout(
        &mut self,
        buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> Result<LayoutHandle, GpuError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(GpuError::UnknownHandle {
                kind: "buffer",
                id: buffer.0,
            });
        }
        if *layout != GpuVertex::LAYOUT {
            return Err(GpuError::LayoutMismatch(format!(
                "stride {} with {} attributes",
                layout.stride,
                layout.attributes.len()
            )));
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
        let Some(base) = levels.first() else {
            return Err(GpuError::EmptyTexture(label.to_string()));
        };
        let limit = self.device.limits().max_texture_dimension_2d;
        if base.width > limit || base.height > limit {
            return Err(GpuError::TextureTooLarge {
                label: label.to_string(),
                width: base.width,
                height: base.height,
                limit,
            });
        }
        let texture = self.scoped(label, |device, queue| {
            upload_texture(device, queue, label, levels, kind, filter)
        })?;
        let handle = TextureHandle(self.next());
        self.textures.insert(handle, texture);
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
        entry.sampler = self
            .device
            .create_sampler(&sampler_descriptor(Some("Texture sampler"), filter));
        Ok(())
    }

    fn destroy_vertex_layout(&mut self, layout: LayoutHandle) {
        if self.layouts.remove(&layout).is_none() {
            log::warn!("destroy_vertex_layout: unknown {:?}", layout);
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.remove(&buffer) {
            Some(b) => b.destroy(),
            None => log::warn!("destroy_buffer: unknown {:?}", buffer),
        }
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        match self.textures.remove(&texture) {
            Some(t) => t.texture.destroy(),
            None => log::warn!("destroy_texture: unknown {:?}", texture),
        }
    }
}

impl Drop for WgpuDevice {
    fn drop(&mut self) {
        let (buffers, layouts, textures) = self.live_counts();
        if buffers + layouts + textures > 0 {
            log::warn!(
                "GPU device dropped with {} buffers, {} layouts, {} textures still alive",
                buffers,
                layouts,
                textures
            );
        }
    }
}

/// One draw call captured for replay inside a render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub face: FaceMode,
    pub raster: RasterMode,
    pub uniforms: DrawUniforms,
    pub layout: LayoutHandle,
    pub vertex_count: u32,
    pub textures: [Option<TextureHandle>; TextureSlot::COUNT],
}

/// Collects draw commands for a frame; the render pass replays them.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    face: FaceMode,
    raster: RasterMode,
    textures: [Option<TextureHandle>; TextureSlot::COUNT],
    uniforms: Option<DrawUniforms>,
    layout: Option<LayoutHandle>,
    draws: Vec<RecordedDraw>,
}

impl FrameRecorder {
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn into_draws(self) -> Vec<RecordedDraw> {
        self.draws
    }
}

impl DrawSink for FrameRecorder {
    fn set_raster_state(&mut self, face: FaceMode, raster: RasterMode) {
        self.face = face;
        self.raster = raster;
    }

    fn bind_texture(&mut self, slot: TextureSlot, texture: TextureHandle) {
        self.textures[slot.index()] = Some(texture);
    }

    fn unbind_textures(&mut self) {
        self.textures = [None; TextureSlot::COUNT];
    }

    fn set_uniforms(&mut self, uniforms: &DrawUniforms) {
        self.uniforms = Some(*uniforms);
    }

    fn bind_vertex_layout(&mut self, layout: LayoutHandle) {
        self.layout = Some(layout);
    }

    fn draw_triangles(&mut self, vertex_count: u32) {
        let (Some(uniforms), Some(layout)) = (self.uniforms, self.layout) else {
            log::warn!("draw_triangles without uniforms or vertex layout, ignored");
            return;
        };
        self.draws.push(RecordedDraw {
            face: self.face,
            raster: self.raster,
            uniforms,
            layout,
            vertex_count,
            textures: self.textures,
        });
    }
}
