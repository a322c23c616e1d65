//! This module contains the thin layer over OpenGL the rest of the crate builds on:
//! the driver seam, shader programs, textures and mesh buffers.

#[cfg(feature = "viewer")]
pub mod app;
pub mod gpu;
pub mod mesh;
pub mod shader;
pub mod texture;

#[cfg(feature = "viewer")]
pub use app::*;
pub use gpu::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;
