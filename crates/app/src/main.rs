//! Entry point for the Svarog mesh viewer.
//! Logging + CLI flags; file arguments are imported at startup.

use std::path::PathBuf;

use anyhow::Result;
use platform::ViewerConfig;
use renderer::{FaceMode, FilterMode, Normalization, RasterMode, RenderSettings};

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(1280).max(1);
    let hh = h.unwrap_or(720).max(1);
    (ww, hh)
}

/// Value of the last `--{name}=` flag parsed by `parse`; unknown values are ignored.
fn parse_choice<T>(args: &[String], name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let prefix = format!("--{name}=");
    let mut chosen = None;
    for arg in args {
        if let Some(val) = arg.strip_prefix(prefix.as_str()) {
            match parse(val) {
                Some(v) => chosen = Some(v),
                None => log::warn!("Unknown {} '{}', keeping default.", name, val),
            }
        }
    }
    chosen
}

fn parse_settings(args: &[String]) -> RenderSettings {
    let defaults = RenderSettings::default();
    RenderSettings {
        raster: parse_choice(args, "render-mode", RasterMode::parse).unwrap_or(defaults.raster),
        face: parse_choice(args, "face-mode", FaceMode::parse).unwrap_or(defaults.face),
        filter: parse_choice(args, "filter", FilterMode::parse).unwrap_or(defaults.filter),
        normalization: parse_choice(args, "normalize", Normalization::parse)
            .unwrap_or(defaults.normalization),
    }
}

/// Positional (non-flag) arguments are scene files.
fn parse_files(args: &[String]) -> Vec<PathBuf> {
    args.iter()
        .filter(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .collect()
}

fn parse_config(args: &[String]) -> ViewerConfig {
    let (width, height) = parse_size_args(args);
    ViewerConfig {
        backends: parse_backend_arg(args),
        width,
        height,
        settings: parse_settings(args),
        files: parse_files(args),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = parse_config(&args);
    log::info!(
        "Starting Svarog Viewer. Backend: {:?}, window_size={}x{}, settings={:?}, files={}",
        config.backends,
        config.width,
        config.height,
        config.settings,
        config.files.len()
    );

    platform::run_viewer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
