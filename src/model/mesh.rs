//! A renderable mesh: vertex and index data, its textures and the GPU buffers holding it.

use std::mem::offset_of;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::abs::{Gpu, MeshBuffers, ShaderProgram, Texture, VertexAttribute, VertexLayout};

/// Interleaved vertex as uploaded to the vertex buffer.
///
/// Shader locations: 0 position, 1 normal, 2 texture coordinates, 3 tangent, 4 bitangent.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl VertexLayout for Vertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::new(0, 3, offset_of!(Vertex, position)),
        VertexAttribute::new(1, 3, offset_of!(Vertex, normal)),
        VertexAttribute::new(2, 2, offset_of!(Vertex, tex_coords)),
        VertexAttribute::new(3, 3, offset_of!(Vertex, tangent)),
        VertexAttribute::new(4, 3, offset_of!(Vertex, bitangent)),
    ];
}

pub struct Mesh<G: Gpu = glow::Context> {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    textures: Vec<Arc<Texture<G>>>,
    buffers: MeshBuffers<G>,
}

impl<G: Gpu> Mesh<G> {
    /// Uploads the vertex and index data and takes shared ownership of `textures`.
    pub fn new(
        gl: &Arc<G>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        textures: Vec<Arc<Texture<G>>>,
    ) -> Result<Self, String> {
        let buffers = MeshBuffers::new(gl, &vertices, &indices)?;
        Ok(Self {
            vertices,
            indices,
            textures,
            buffers,
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Triangle list indices into [`Mesh::vertices`].
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn textures(&self) -> &[Arc<Texture<G>>] {
        &self.textures
    }

    /// Binds every texture to its own unit, points the matching sampler at it and draws.
    ///
    /// Samplers are named after the texture kind and numbered per kind from 1, so the
    /// second diffuse texture is `texture_diffuse2`. `shader` must be in use.
    pub fn draw(&self, shader: &ShaderProgram<G>) {
        let mut counts = [0u32; 4];
        for (unit, texture) in self.textures.iter().enumerate() {
            let count = &mut counts[texture.kind().index()];
            *count += 1;
            let sampler = format!("{}{}", texture.kind().sampler_prefix(), count);
            shader.set_uniform(&sampler, unit as i32);
            texture.bind(unit as u32);
        }

        self.buffers.draw();
    }
}

impl<G: Gpu> std::fmt::Debug for Mesh<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .field("textures", &self.textures)
            .finish()
    }
}
