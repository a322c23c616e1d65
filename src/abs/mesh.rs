//! Mesh management module.
//!
//! This module defines the [`MeshBuffers`] struct for managing mesh data on the GPU side.
//! Vertices should implement the [`VertexLayout`] trait.

use std::sync::Arc;

use super::gpu::{Gpu, VertexAttribute};

/// Trait that describes how an interleaved vertex is laid out.
pub trait VertexLayout: bytemuck::Pod {
    /// Float attributes of the vertex, in shader location order.
    const ATTRIBUTES: &'static [VertexAttribute];
}

/// Vertex array, vertex buffer and element buffer of one indexed triangle mesh.
pub struct MeshBuffers<G: Gpu = glow::Context> {
    gl: Arc<G>,
    vao: G::VertexArray,
    vbo: G::Buffer,
    ebo: G::Buffer,
    index_count: usize,
}

impl<G: Gpu> MeshBuffers<G> {
    /// Creates a new mesh from the given vertex and index data.
    pub fn new<V: VertexLayout>(gl: &Arc<G>, vertices: &[V], indices: &[u32]) -> Result<Self, String> {
        let vao = gl.create_vertex_array()?;
        let vbo = gl.create_buffer().inspect_err(|_| gl.delete_vertex_array(vao))?;
        let ebo = gl.create_buffer().inspect_err(|_| {
            gl.delete_buffer(vbo);
            gl.delete_vertex_array(vao);
        })?;

        gl.upload_mesh(
            vao,
            vbo,
            ebo,
            bytemuck::cast_slice(vertices),
            std::mem::size_of::<V>() as i32,
            V::ATTRIBUTES,
            indices,
        );

        Ok(Self {
            gl: Arc::clone(gl),
            vao,
            vbo,
            ebo,
            index_count: indices.len(),
        })
    }

    /// Draws the mesh.
    pub fn draw(&self) {
        self.gl.draw_triangles(self.vao, self.index_count as i32);
    }

    /// Number of indices drawn per call.
    pub fn index_count(&self) -> usize {
        self.index_count
    }
}

impl<G: Gpu> Drop for MeshBuffers<G> {
    fn drop(&mut self) {
        self.gl.delete_buffer(self.vbo);
        self.gl.delete_buffer(self.ebo);
        self.gl.delete_vertex_array(self.vao);
    }
}
