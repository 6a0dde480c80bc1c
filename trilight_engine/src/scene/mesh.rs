//! GPU mesh
//!
//! A mesh owns its four GPU buffers (positions, uvs, normals, indices)
//! and draws itself under whichever pass pipeline the context carries.
//! Vertex data uses three separate streams with one attribute each; the
//! lighting pipeline consumes all three, the depth-only shadow pipeline
//! only the position stream.

use glam::Mat4;
use std::sync::Arc;

use crate::error::Result;
use crate::gpu::{
    Buffer, BufferDesc, BufferUsage, CommandList, Device, TextureFormat, VertexAttribute,
    VertexBinding, VertexLayout,
};
use crate::scene::drawable::{DrawContext, Drawable};
use crate::scene::primitives::MeshData;

/// Position-only vertex input layout, for depth-only pipelines
pub fn position_vertex_layout() -> VertexLayout {
    VertexLayout {
        bindings: vec![VertexBinding {
            binding: 0,
            stride: 12,
            attributes: vec![VertexAttribute {
                location: 0,
                format: TextureFormat::R32g32b32Sfloat,
                offset: 0,
            }],
        }],
    }
}

/// Full three-stream vertex input layout of the lighting pipeline
pub fn mesh_vertex_layout() -> VertexLayout {
    VertexLayout {
        bindings: vec![
            VertexBinding {
                binding: 0,
                stride: 12,
                attributes: vec![VertexAttribute {
                    location: 0,
                    format: TextureFormat::R32g32b32Sfloat,
                    offset: 0,
                }],
            },
            VertexBinding {
                binding: 1,
                stride: 8,
                attributes: vec![VertexAttribute {
                    location: 1,
                    format: TextureFormat::R32g32Sfloat,
                    offset: 0,
                }],
            },
            VertexBinding {
                binding: 2,
                stride: 12,
                attributes: vec![VertexAttribute {
                    location: 2,
                    format: TextureFormat::R32g32b32Sfloat,
                    offset: 0,
                }],
            },
        ],
    }
}

/// A textured, indexed triangle mesh
pub struct Mesh {
    positions: Arc<dyn Buffer>,
    uvs: Arc<dyn Buffer>,
    normals: Arc<dyn Buffer>,
    indices: Arc<dyn Buffer>,
    index_count: u32,
    texture_name: String,
    transform: Mat4,
}

impl Mesh {
    /// Upload mesh data and create the GPU buffers
    ///
    /// # Arguments
    ///
    /// * `device` - Resource factory
    /// * `name` - Debug name prefix for the buffers
    /// * `data` - CPU-side mesh data
    /// * `texture_name` - Registry name of the albedo texture
    /// * `transform` - Local transform
    pub fn new(
        device: &Arc<dyn Device>,
        name: &str,
        data: &MeshData,
        texture_name: &str,
        transform: Mat4,
    ) -> Result<Self> {
        let positions = Self::upload(device, &format!("{}_positions", name), BufferUsage::Vertex,
            bytemuck::cast_slice(&data.positions))?;
        let uvs = Self::upload(device, &format!("{}_uvs", name), BufferUsage::Vertex,
            bytemuck::cast_slice(&data.uvs))?;
        let normals = Self::upload(device, &format!("{}_normals", name), BufferUsage::Vertex,
            bytemuck::cast_slice(&data.normals))?;
        let indices = Self::upload(device, &format!("{}_indices", name), BufferUsage::Index,
            bytemuck::cast_slice(&data.indices))?;

        Ok(Self {
            positions,
            uvs,
            normals,
            indices,
            index_count: data.indices.len() as u32,
            texture_name: texture_name.to_string(),
            transform,
        })
    }

    fn upload(
        device: &Arc<dyn Device>,
        name: &str,
        usage: BufferUsage,
        bytes: &[u8],
    ) -> Result<Arc<dyn Buffer>> {
        let buffer = device.create_buffer(&BufferDesc {
            name: name.to_string(),
            size: bytes.len() as u64,
            usage,
        })?;
        buffer.update(0, bytes)?;
        Ok(buffer)
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl Drawable for Mesh {
    fn draw(&self, cmd: &dyn CommandList, ctx: &DrawContext, parent: Mat4) -> Result<()> {
        match ctx.textures {
            Some(registry) => {
                let group = registry.group(&self.texture_name)?;
                cmd.bind_binding_group(ctx.pipeline, 0, group)?;
                cmd.bind_vertex_buffers(0, &[&self.positions, &self.uvs, &self.normals])?;
            }
            // Depth-only: no texture set, position stream alone.
            None => cmd.bind_vertex_buffers(0, &[&self.positions])?,
        }
        cmd.bind_index_buffer(&self.indices)?;

        let model = parent * self.transform;
        cmd.push_constants(ctx.pipeline, ctx.model_push_offset, bytemuck::bytes_of(&model))?;

        cmd.draw_indexed(self.index_count)
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod mesh_tests;
