//! A small OpenGL rendering scaffold.
//!
//! - [`Camera`]: a free-fly camera producing view and projection matrices.
//! - [`ShaderProgram`]: GLSL programs built from source files, with per-stage diagnostics.
//! - [`Model`]: meshes and textures loaded from OBJ or glTF scenes, with textures shared
//!   between meshes that reference the same file.
//!
//! Everything that talks to the driver does so through the [`Gpu`] trait, implemented for
//! [`glow::Context`].

pub mod abs;
pub mod camera;
pub mod config;
pub mod model;
pub mod scene;

#[cfg(test)]
mod testing;

pub use abs::{
    BuildStep, Gpu, MeshBuffers, PixelFormat, Shader, ShaderError, ShaderProgram, ShaderSources,
    ShaderStage, StageDiagnostic, Texture, TextureError, Uniform, UniformValue, VertexAttribute,
    VertexLayout,
};
pub use camera::{Camera, CameraMovement};
pub use config::{CameraSettings, ConfigError, ViewerConfig};
pub use model::{LoadIssue, Mesh, Model, ModelError, Vertex};
pub use scene::{ImportOptions, Scene, SceneError, TextureKind};
