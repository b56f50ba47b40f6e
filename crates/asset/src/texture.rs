//! Texture loading and data structures.
//! Decodes raster images to RGBA8 and builds mip chains before GPU upload.

use std::path::Path;

use anyhow::{Result, anyhow, ensure};
use image::{RgbaImage, imageops::FilterType};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        ensure!(
            data.len() == (width as usize) * (height as usize) * 4,
            "Data size {} doesn't match RGBA8 {}x{}",
            data.len(),
            width,
            height
        );
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        })
    }

    /// Decode any supported raster file (PNG, JPEG, BMP, TGA) into RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path)
            .map_err(|e| anyhow!("Failed to open image {:?}: {}", path, e))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        ensure!(width > 0 && height > 0, "Image {:?} is empty", path);

        log::info!("Loaded texture {}x{} with {} bytes", width, height, rgba.len());

        Self::new_rgba8(width, height, rgba.into_raw())
    }

    /// A 1x1 texture of a single color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            data: rgba.to_vec(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        }
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size =
            (self.width as usize) * (self.height as usize) * self.bytes_per_pixel() as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }

    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }

    /// Full mip chain, level 0 first. Each level halves both sides (clamped to 1).
    pub fn mip_chain(&self) -> Result<Vec<TextureData>> {
        let base = RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| anyhow!("Texture data does not match {}x{}", self.width, self.height))?;

        let mut levels = Vec::with_capacity(self.mip_level_count() as usize);
        levels.push(self.clone());

        let mut current = base;
        while current.width() > 1 || current.height() > 1 {
            let w = (current.width() / 2).max(1);
            let h = (current.height() / 2).max(1);
            current = image::imageops::resize(&current, w, h, FilterType::Triangle);
            levels.push(Self::new_rgba8(w, h, current.as_raw().clone())?);
        }

        Ok(levels)
    }
}
