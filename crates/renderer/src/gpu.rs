//! Graphics-API-independent device seam.
//!
//! Every GPU object the ingestion pipeline creates goes through [`GpuDevice`]
//! and is referred to by a typed handle. The device owns the real objects
//! (an arena keyed by handle); callers own only handles and must hand each one
//! back exactly once through the matching `destroy_*` call.

use asset::{TextureData, TextureSlot};
use thiserror::Error;

/// Handle of a GPU vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Handle of a vertex-layout object (buffer + attribute description).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutHandle(pub u32);

/// Handle of a sampled 2D texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Error, PartialEq)]
pub enum GpuError {
    #[error("buffer '{label}' of {size} bytes exceeds the device limit of {limit} bytes")]
    BufferTooLarge { label: String, size: u64, limit: u64 },
    #[error("texture '{label}' of {width}x{height} exceeds the device limit of {limit}")]
    TextureTooLarge {
        label: String,
        width: u32,
        height: u32,
        limit: u32,
    },
    #[error("texture '{0}' has no mip levels")]
    EmptyTexture(String),
    #[error("vertex layout does not match the pipeline layout: {0}")]
    LayoutMismatch(String),
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("GPU allocation failed: {0}")]
    Allocation(String),
}

/// Texture sampling policy, applied uniformly to every resident texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    #[default]
    Bilinear,
    Trilinear,
    Anisotropic,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::Nearest,
        FilterMode::Bilinear,
        FilterMode::Trilinear,
        FilterMode::Anisotropic,
    ];

    /// Next mode in cycle order, wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "nearest" | "none" => Some(Self::Nearest),
            "bilinear" | "linear" => Some(Self::Bilinear),
            "trilinear" => Some(Self::Trilinear),
            "anisotropic" | "aniso" => Some(Self::Anisotropic),
            _ => None,
        }
    }

    /// Sampler parameters this policy maps to.
    pub fn sampler_params(self) -> SamplerParams {
        match self {
            FilterMode::Nearest => SamplerParams {
                min: Filter::Nearest,
                mag: Filter::Nearest,
                mipmap: None,
                anisotropy: 1,
            },
            FilterMode::Bilinear => SamplerParams {
                min: Filter::Linear,
                mag: Filter::Linear,
                mipmap: None,
                anisotropy: 1,
            },
            FilterMode::Trilinear => SamplerParams {
                min: Filter::Linear,
                mag: Filter::Linear,
                mipmap: Some(Filter::Linear),
                anisotropy: 1,
            },
            FilterMode::Anisotropic => SamplerParams {
                min: Filter::Linear,
                mag: Filter::Linear,
                mipmap: Some(Filter::Linear),
                anisotropy: MAX_ANISOTROPY,
            },
        }
    }
}

pub const MAX_ANISOTROPY: u16 = 16;

/// How texel values are interpreted. Color maps are sRGB encoded; data maps
/// (normals, masks, exponents) are sampled as stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureKind {
    #[default]
    Color,
    Data,
}

impl TextureKind {
    pub fn for_slot(slot: TextureSlot) -> Self {
        match slot {
            TextureSlot::Bump | TextureSlot::Alpha | TextureSlot::SpecularHighlight => {
                TextureKind::Data
            }
            TextureSlot::Ambient
            | TextureSlot::Diffuse
            | TextureSlot::Specular
            | TextureSlot::Reflection => TextureKind::Color,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// `mipmap == None` samples the base level only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerParams {
    pub min: Filter,
    pub mag: Filter,
    pub mipmap: Option<Filter>,
    pub anisotropy: u16,
}

/// One float attribute inside an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u64,
    pub components: u32,
}

/// Interleaved vertex layout: stride plus attributes at shader-agreed locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: &'static [VertexAttribute],
}

/// GPU object factory. Implementations must only be used on the thread that
/// owns the graphics context.
pub trait GpuDevice {
    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8])
    -> Result<BufferHandle, GpuError>;

    fn create_vertex_layout(
        &mut self,
        buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> Result<LayoutHandle, GpuError>;

    /// Upload a texture; `levels[0]` is the base level, the rest its mip chain.
    fn create_texture(
        &mut self,
        label: &str,
        levels: &[TextureData],
        kind: TextureKind,
        filter: FilterMode,
    ) -> Result<TextureHandle, GpuError>;

    /// Re-apply a filtering policy to an existing texture.
    fn set_texture_filter(
        &mut self,
        texture: TextureHandle,
        filter: FilterMode,
    ) -> Result<(), GpuError>;

    fn destroy_vertex_layout(&mut self, layout: LayoutHandle);
    fn destroy_buffer(&mut self, buffer: BufferHandle);
    fn destroy_texture(&mut self, texture: TextureHandle);
}
