//! Vertex buffer + layout creation for draw groups.

use asset::Vertex;
use thiserror::Error;

use crate::{
    gpu::{GpuDevice, GpuError},
    loaded::{DrawGroup, GroupBuffers},
    vertex::{GpuVertex, interleave},
};

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("draw group already owns GPU buffers")]
    AlreadyBuilt,
    #[error("draw group has {vertices} vertices, expected {expected}")]
    VertexCountMismatch { vertices: usize, expected: usize },
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Upload `vertices` for `group` and attach the resulting handles.
///
/// Must be called once per group. On failure nothing stays allocated.
pub fn build_group_buffers<D: GpuDevice + ?Sized>(
    device: &mut D,
    label: &str,
    group: &mut DrawGroup,
    vertices: &[Vertex],
) -> Result<GroupBuffers, BuildError> {
    if group.gpu.is_some() {
        return Err(BuildError::AlreadyBuilt);
    }
    let expected = group.vertex_count() as usize;
    if vertices.len() != expected {
        return Err(BuildError::VertexCountMismatch {
            vertices: vertices.len(),
            expected,
        });
    }

    let data = interleave(vertices);
    let buffer = device.create_vertex_buffer(label, bytemuck::cast_slice(&data))?;
    let layout = match device.create_vertex_layout(buffer, &GpuVertex::LAYOUT) {
        Ok(layout) => layout,
        Err(err) => {
            device.destroy_buffer(buffer);
            return Err(err.into());
        }
    };

    let buffers = GroupBuffers { buffer, layout };
    group.gpu = Some(buffers);
    Ok(buffers)
}
