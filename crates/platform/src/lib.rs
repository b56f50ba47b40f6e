//! Platform layer: windowing, event loop and the file-drop entry point.
//!
//! - Redraws are requested only when something changed.
//! - Dropped files are imported into the viewer context as they arrive.
//! - Every GPU resource is released before the device goes away.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use corelib::camera::Camera;
use renderer::{
    FilterMode, GpuState, Normalization, RasterMode, RenderSettings, ViewerContext,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Everything the viewer needs to start.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub settings: RenderSettings,
    /// Files imported at startup, as if dropped on the window.
    pub files: Vec<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            settings: RenderSettings::default(),
            files: Vec::new(),
        }
    }
}

/// User command bound to a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    SetRaster(RasterMode),
    CycleFace,
    CycleFilter,
    ToggleNormalization,
    Quit,
}

pub fn key_action(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(Action::SetRaster(RasterMode::Fill)),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some(Action::SetRaster(RasterMode::Wireframe)),
        KeyCode::Digit3 | KeyCode::Numpad3 => Some(Action::SetRaster(RasterMode::Points)),
        KeyCode::KeyC => Some(Action::CycleFace),
        KeyCode::KeyF => Some(Action::CycleFilter),
        KeyCode::KeyN => Some(Action::ToggleNormalization),
        KeyCode::Escape => Some(Action::Quit),
        _ => None,
    }
}

struct Viewer {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    ctx: ViewerContext,
    pending: Vec<PathBuf>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        Self {
            ctx: ViewerContext::new(config.settings),
            pending: config.files.clone(),
            config,
            window: None,
            gpu: None,
            error: None,
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    /// Import queued files once the device exists.
    fn flush_pending(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        let paths = std::mem::take(&mut self.pending);
        let report = self.ctx.import(gpu.device_mut(), &paths);
        log::info!(
            "Imported {} of {} files ({} resident)",
            report.loaded.len(),
            paths.len(),
            self.ctx.assets().len()
        );
        self.request_redraw();
    }

    fn apply(&mut self, action: Action, event_loop: &ActiveEventLoop) {
        match action {
            Action::SetRaster(raster) => {
                if self.gpu.as_ref().is_some_and(|gpu| !gpu.supports(raster)) {
                    log::warn!("{:?} is not supported by this adapter, drawing filled", raster);
                }
                self.ctx.set_raster_mode(raster);
                log::info!("Render mode: {:?}", raster);
            }
            Action::CycleFace => {
                let next = self.ctx.settings().face.next();
                self.ctx.set_face_mode(next);
                log::info!("Face mode: {:?}", next);
            }
            Action::CycleFilter => {
                let next: FilterMode = self.ctx.filter_mode().next();
                if let Some(gpu) = self.gpu.as_mut() {
                    if let Err(err) = self.ctx.set_filter_mode(gpu.device_mut(), next) {
                        log::error!("Failed to apply filter {:?}: {}", next, err);
                    }
                }
            }
            Action::ToggleNormalization => {
                let next = match self.ctx.settings().normalization {
                    Normalization::FirstGroup => Normalization::Union,
                    Normalization::Union => Normalization::FirstGroup,
                };
                self.ctx.set_normalization(next);
                log::info!("Normalization: {:?}", next);
            }
            Action::Quit => {
                log::info!("Escape pressed. Exiting event loop.");
                event_loop.exit();
                return;
            }
        }
        self.request_redraw();
    }

    fn render(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let camera = Camera::viewer(gpu.aspect());
        match gpu.render(&self.ctx, &camera) {
            Ok(()) => {}
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("Surface lost/outdated: {err:?}. Recreating.");
                gpu.recreate_surface();
                self.request_redraw();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory while rendering");
            }
            Err(err) => log::warn!("Frame skipped: {err:?}"),
        }
    }

    fn shutdown(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            self.ctx.shutdown(gpu.device_mut());
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Svarog Viewer")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.error = Some(anyhow::anyhow!("Failed to create window: {err}"));
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        match pollster::block_on(GpuState::new(window.clone(), self.config.backends)) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                self.error = Some(err.context("GPU initialisation failed"));
                event_loop.exit();
                return;
            }
        }
        self.window = Some(window);
        self.flush_pending();
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size.width, size.height);
                }
                self.request_redraw();
            }
            WindowEvent::DroppedFile(path) => {
                log::info!("Dropped: {}", path.display());
                self.pending.push(path);
                self.flush_pending();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(action) = key_action(code) {
                    self.apply(action, event_loop);
                }
            }
            WindowEvent::RedrawRequested => self.render(),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

/// Open the viewer window and run until it is closed.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut viewer = Viewer::new(config);
    event_loop
        .run_app(&mut viewer)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    // `exiting` normally did this already; a second call is a no-op.
    viewer.shutdown();
    match viewer.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
