//! Renderer: mesh ingestion into GPU resources and the wgpu frame loop.
//! wgpu = 26.x, winit = 0.30.x

pub mod buffers;
pub mod context;
pub mod draw;
pub mod gpu;
pub mod ingest;
pub mod lifecycle;
pub mod loaded;
pub mod texture_cache;
pub mod vertex;
pub mod wgpu_backend;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use bytemuck::{Pod, Zeroable};
use corelib::camera::Camera;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayout, PipelineLayoutDescriptor, PolygonMode, PowerPreference, PresentMode,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    ShaderModule, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor, VertexState, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use context::{ImportReport, Normalization, RenderSettings, ViewerContext};
pub use draw::{FaceMode, RasterMode};
pub use gpu::{FilterMode, GpuDevice, GpuError};
pub use ingest::{LoadError, load_asset, try_load_asset};
pub use loaded::LoadedAsset;
pub use wgpu_backend::{FrameRecorder, WgpuDevice};

use wgpu_backend::{DRAW_UNIFORM_SIZE, RecordedDraw, create_material_layout};

pub const NUM_LIGHTS: usize = 5;

/// Light UBO. Matches `Lights` in `shaders/mesh.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct LightsUniform {
    pub light_posn: [[f32; 4]; NUM_LIGHTS],
    pub light_col: [[f32; 4]; NUM_LIGHTS],
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self {
            light_posn: [
                [0.0, 100.0, 200.0, 1.0],
                [300.0, 400.0, 500.0, 1.0],
                [-200.0, 100.0, 0.0, 1.0],
                [200.0, 200.0, 200.0, 1.0],
                [0.0, 0.0, 800.0, 1.0],
            ],
            light_col: [[1.0; 4]; NUM_LIGHTS],
        }
    }
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device arena (owns device + queue)
    backend: WgpuDevice,

    // One pipeline per (raster, face) combination
    pipelines: HashMap<(RasterMode, FaceMode), RenderPipeline>,
    polygon_features: Features,

    // Lights (group 0)
    lights_bg: BindGroup,
    #[allow(dead_code)]
    lights_buf: Buffer,

    // Per-draw uniforms (group 1)
    material_bgl: BindGroupLayout,
    uniform_buf: Buffer,
    uniform_capacity: u64,
    uniform_stride: u64,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Adapter: {:?}", adapter.get_info());

        // Wireframe and point modes need optional features; fall back to fill without them.
        let polygon_features = adapter.features()
            & (Features::POLYGON_MODE_LINE | Features::POLYGON_MODE_POINT);
        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Svarog Viewer Device"),
                required_features: polygon_features,
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                ..Default::default()
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, &surface_config);

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mesh WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // ==== Lights BGL/BG ====
        let lights_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Lights BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<LightsUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let lights_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights UBO"),
            contents: bytemuck::bytes_of(&LightsUniform::default()),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let lights_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lights BG"),
            layout: &lights_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: lights_buf.as_entire_binding(),
            }],
        });

        // ==== Pipelines ====
        let material_bgl = create_material_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&lights_bgl, &material_bgl],
            push_constant_ranges: &[],
        });
        let mut pipelines = HashMap::new();
        for raster in RasterMode::ALL {
            for face in FaceMode::ALL {
                let pipeline = create_mesh_pipeline(
                    &device,
                    &pipeline_layout,
                    &shader,
                    surface_format,
                    polygon_mode(raster, polygon_features),
                    face,
                );
                pipelines.insert((raster, face), pipeline);
            }
        }

        let uniform_stride = DRAW_UNIFORM_SIZE.max(u64::from(
            device.limits().min_uniform_buffer_offset_alignment,
        ));
        let uniform_capacity = 64;
        let uniform_buf = create_uniform_buffer(&device, uniform_stride * uniform_capacity);

        Ok(Self {
            surface,
            surface_config,
            backend: WgpuDevice::new(device, queue),
            pipelines,
            polygon_features,
            lights_bg,
            lights_buf,
            material_bgl,
            uniform_buf,
            uniform_capacity,
            uniform_stride,
            depth_view,
            width,
            height,
        })
    }

    /// Device used for loading and releasing assets.
    pub fn device_mut(&mut self) -> &mut WgpuDevice {
        &mut self.backend
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn supports(&self, raster: RasterMode) -> bool {
        polygon_mode(raster, self.polygon_features) != PolygonMode::Fill
            || raster == RasterMode::Fill
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        let device = self.backend.device();
        self.surface.configure(device, &self.surface_config);
        self.depth_view = create_depth_view(device, &self.surface_config);
    }

    /// Render one frame: record the context's draws, then replay them in one pass.
    pub fn render(&mut self, ctx: &ViewerContext, camera: &Camera) -> Result<(), SurfaceError> {
        let mut recorder = FrameRecorder::default();
        ctx.draw(&mut recorder, camera);
        let draws = recorder.into_draws();

        self.upload_uniforms(&draws);
        let bind_groups: Vec<BindGroup> = draws
            .iter()
            .enumerate()
            .map(|(i, draw)| {
                self.backend.material_bind_group(
                    &self.material_bgl,
                    &self.uniform_buf,
                    i as u64 * self.uniform_stride,
                    &draw.textures,
                )
            })
            .collect();

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());
        let device = self.backend.device();
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("MainEncoder"),
        });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_bind_group(0, &self.lights_bg, &[]);
            for (draw, bind_group) in draws.iter().zip(&bind_groups) {
                let Some(pipeline) = self.pipelines.get(&(draw.raster, draw.face)) else {
                    continue;
                };
                let Some(vertices) = self.backend.layout_buffer(draw.layout) else {
                    log::warn!("Draw references released layout {:?}", draw.layout);
                    continue;
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(1, bind_group, &[]);
                rpass.set_vertex_buffer(0, vertices.slice(..));
                rpass.draw(0..draw.vertex_count, 0..1);
            }
        }

        self.backend.queue().submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn upload_uniforms(&mut self, draws: &[RecordedDraw]) {
        if draws.is_empty() {
            return;
        }
        let needed = draws.len() as u64;
        if needed > self.uniform_capacity {
            self.uniform_capacity = needed.next_power_of_two();
            self.uniform_buf = create_uniform_buffer(
                self.backend.device(),
                self.uniform_stride * self.uniform_capacity,
            );
        }
        let stride = self.uniform_stride as usize;
        let mut staging = vec![0u8; stride * draws.len()];
        for (chunk, draw) in staging.chunks_exact_mut(stride).zip(draws) {
            chunk[..DRAW_UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&draw.uniforms));
        }
        self.backend
            .queue()
            .write_buffer(&self.uniform_buf, 0, &staging);
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

fn polygon_mode(raster: RasterMode, features: Features) -> PolygonMode {
    match raster {
        RasterMode::Fill => PolygonMode::Fill,
        RasterMode::Wireframe if features.contains(Features::POLYGON_MODE_LINE) => {
            PolygonMode::Line
        }
        RasterMode::Points if features.contains(Features::POLYGON_MODE_POINT) => {
            PolygonMode::Point
        }
        _ => PolygonMode::Fill,
    }
}

fn cull_mode(face: FaceMode) -> Option<wgpu::Face> {
    match face {
        FaceMode::Front => Some(wgpu::Face::Back),
        FaceMode::Back => Some(wgpu::Face::Front),
        FaceMode::FrontAndBack => None,
    }
}

fn create_mesh_pipeline(
    device: &Device,
    layout: &PipelineLayout,
    shader: &ShaderModule,
    format: TextureFormat,
    polygon_mode: PolygonMode,
    face: FaceMode,
) -> RenderPipeline {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Mesh Pipeline"),
        layout: Some(layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex::GpuVertex::WGPU_LAYOUT],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: cull_mode(face),
            polygon_mode,
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_uniform_buffer(device: &Device, size: u64) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw UBO"),
        size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lights_are_five_white_points() {
        let lights = LightsUniform::default();
        assert_eq!(lights.light_posn[1], [300.0, 400.0, 500.0, 1.0]);
        assert_eq!(lights.light_posn[4], [0.0, 0.0, 800.0, 1.0]);
        assert!(lights.light_col.iter().all(|c| *c == [1.0; 4]));
        assert_eq!(std::mem::size_of::<LightsUniform>(), 2 * NUM_LIGHTS * 16);
    }

    #[test]
    fn face_mode_culls_the_other_side() {
        assert_eq!(cull_mode(FaceMode::Front), Some(wgpu::Face::Back));
        assert_eq!(cull_mode(FaceMode::Back), Some(wgpu::Face::Front));
        assert_eq!(cull_mode(FaceMode::FrontAndBack), None);
    }

    #[test]
    fn missing_polygon_features_fall_back_to_fill() {
        assert_eq!(
            polygon_mode(RasterMode::Wireframe, Features::empty()),
            PolygonMode::Fill
        );
        assert_eq!(
            polygon_mode(RasterMode::Points, Features::POLYGON_MODE_POINT),
            PolygonMode::Point
        );
        assert_eq!(
            polygon_mode(RasterMode::Wireframe, Features::POLYGON_MODE_LINE),
            PolygonMode::Line
        );
    }
}
