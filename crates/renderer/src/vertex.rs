//! Interleaved GPU vertex format.

use bytemuck::{Pod, Zeroable};
use wgpu::{VertexBufferLayout, VertexStepMode};

use crate::gpu::{VertexAttribute, VertexLayout};

pub const POSITION_LOCATION: u32 = 0;
pub const NORMAL_LOCATION: u32 = 1;
pub const TEXCOORD_LOCATION: u32 = 2;

/// Vertex: position + normal + uv, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl GpuVertex {
    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<GpuVertex>() as u64,
        attributes: &[
            VertexAttribute {
                location: POSITION_LOCATION,
                offset: 0,
                components: 3,
            },
            VertexAttribute {
                location: NORMAL_LOCATION,
                offset: 12,
                components: 3,
            },
            VertexAttribute {
                location: TEXCOORD_LOCATION,
                offset: 24,
                components: 2,
            },
        ],
    };

    pub const WGPU_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            POSITION_LOCATION => Float32x3,
            NORMAL_LOCATION => Float32x3,
            TEXCOORD_LOCATION => Float32x2
        ],
    };
}

impl From<&asset::Vertex> for GpuVertex {
    fn from(v: &asset::Vertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

/// Interleave parsed vertices into upload-ready bytes.
pub fn interleave(vertices: &[asset::Vertex]) -> Vec<GpuVertex> {
    vertices.iter().map(GpuVertex::from).collect()
}
