//! OpenGL Shaders
//!
//! This module defines the [`Shader`] and [`ShaderProgram`] structs for managing OpenGL shaders.
//! This module also provides the [`Uniform`] trait for setting uniform variables in shader
//! programs.
//!
//! Building a program never stops at the first bad stage: every stage is compiled and the
//! program is linked, and everything the driver complained about is kept as
//! [`StageDiagnostic`]s on the resulting [`ShaderProgram`]. Use [`ShaderProgram::strict`] to turn
//! those into an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use thiserror::Error;

use super::gpu::{Gpu, ShaderStage, UniformValue};

/// Errors produced while building a [`ShaderProgram`].
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read {stage} shader source {}: {source}", .path.display())]
    SourceUnreadable {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("graphics driver error: {0}")]
    Driver(String),
    #[error("shader program failed to build:\n{}", join_diagnostics(.0))]
    Build(Vec<StageDiagnostic>),
}

fn join_diagnostics(diagnostics: &[StageDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The build step a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStep {
    Compile(ShaderStage),
    Link,
}

impl BuildStep {
    /// `VERTEX`, `FRAGMENT`, `GEOMETRY` or `PROGRAM`.
    pub fn tag(self) -> &'static str {
        match self {
            BuildStep::Compile(stage) => stage.tag(),
            BuildStep::Link => "PROGRAM",
        }
    }
}

/// The driver's info log for a failed compile or link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDiagnostic {
    pub step: BuildStep,
    pub log: String,
}

impl StageDiagnostic {
    pub fn tag(&self) -> &'static str {
        self.step.tag()
    }
}

impl std::fmt::Display for StageDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.tag(), self.log.trim_end())
    }
}

/// GLSL text for each stage of a program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
}

impl ShaderSources {
    /// Reads every stage fully into memory.
    pub fn read(
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
        geometry: Option<&Path>,
    ) -> Result<Self, ShaderError> {
        Ok(Self {
            vertex: read_source(ShaderStage::Vertex, vertex.as_ref())?,
            fragment: read_source(ShaderStage::Fragment, fragment.as_ref())?,
            geometry: geometry
                .map(|path| read_source(ShaderStage::Geometry, path))
                .transpose()?,
        })
    }
}

fn read_source(stage: ShaderStage, path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| {
        log::error!("failed to read {stage} shader at {}: {source}", path.display());
        ShaderError::SourceUnreadable {
            stage,
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Represents an individual OpenGL shader.
///
/// The shader object is deleted on drop, so stages only live as long as the program build.
pub struct Shader<G: Gpu = glow::Context> {
    gl: Arc<G>,
    id: G::Shader,
    stage: ShaderStage,
    log: Option<String>,
}

impl<G: Gpu> Shader<G> {
    /// Compiles a new shader from the given source code.
    ///
    /// A compile failure still yields a shader; the info log is available from [`Shader::log`].
    pub fn new(gl: &Arc<G>, stage: ShaderStage, source: &str) -> Result<Self, ShaderError> {
        let id = gl.create_shader(stage).map_err(ShaderError::Driver)?;
        let log = gl.compile_shader(id, source).err();
        if let Some(log) = &log {
            log::error!("shader compilation error of type {stage}:\n{}", log.trim_end());
        }

        Ok(Self {
            gl: Arc::clone(gl),
            id,
            stage,
            log,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn is_compiled(&self) -> bool {
        self.log.is_none()
    }

    /// The compiler's info log if compilation failed.
    pub fn log(&self) -> Option<&str> {
        self.log.as_deref()
    }
}

impl<G: Gpu> Drop for Shader<G> {
    fn drop(&mut self) {
        self.gl.delete_shader(self.id);
    }
}

/// Represents a uniform variable in a shader program.
pub trait Uniform {
    /// The value to write to the uniform.
    fn uniform_value(&self) -> UniformValue;
}

impl Uniform for bool {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Bool(*self)
    }
}

impl Uniform for i32 {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Int(*self)
    }
}

impl Uniform for f32 {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Float(*self)
    }
}

impl Uniform for Vec2 {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Vec2(*self)
    }
}

impl Uniform for Vec3 {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Vec3(*self)
    }
}

impl Uniform for Vec4 {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Vec4(*self)
    }
}

impl Uniform for Mat3 {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Mat3(*self)
    }
}

impl Uniform for Mat4 {
    fn uniform_value(&self) -> UniformValue {
        UniformValue::Mat4(*self)
    }
}

impl<T: Uniform> Uniform for &T {
    fn uniform_value(&self) -> UniformValue {
        (*self).uniform_value()
    }
}

/// Represents an OpenGL shader program composed of multiple shaders.
pub struct ShaderProgram<G: Gpu = glow::Context> {
    gl: Arc<G>,
    id: G::Program,
    diagnostics: Vec<StageDiagnostic>,
}

impl<G: Gpu> ShaderProgram<G> {
    /// Links a new shader program from the given shaders.
    ///
    /// Compile logs of the shaders and the link log are collected as diagnostics; the program
    /// handle is kept even when linking fails.
    pub fn new(gl: &Arc<G>, shaders: &[&Shader<G>]) -> Result<Self, ShaderError> {
        let program = gl.create_program().map_err(ShaderError::Driver)?;

        let mut diagnostics: Vec<StageDiagnostic> = shaders
            .iter()
            .filter_map(|shader| {
                shader.log().map(|log| StageDiagnostic {
                    step: BuildStep::Compile(shader.stage()),
                    log: log.to_owned(),
                })
            })
            .collect();

        for shader in shaders {
            gl.attach_shader(program, shader.id);
        }

        if let Err(log) = gl.link_program(program) {
            log::error!("program linking error:\n{}", log.trim_end());
            diagnostics.push(StageDiagnostic {
                step: BuildStep::Link,
                log,
            });
        }

        for shader in shaders {
            gl.detach_shader(program, shader.id);
        }

        Ok(Self {
            gl: Arc::clone(gl),
            id: program,
            diagnostics,
        })
    }

    /// Compiles every stage of `sources` and links them.
    pub fn from_sources(gl: &Arc<G>, sources: &ShaderSources) -> Result<Self, ShaderError> {
        let vertex = Shader::new(gl, ShaderStage::Vertex, &sources.vertex)?;
        let fragment = Shader::new(gl, ShaderStage::Fragment, &sources.fragment)?;
        let geometry = sources
            .geometry
            .as_deref()
            .map(|source| Shader::new(gl, ShaderStage::Geometry, source))
            .transpose()?;

        let mut stages = vec![&vertex, &fragment];
        stages.extend(geometry.as_ref());
        Self::new(gl, &stages)
    }

    /// Reads the stage sources from disk, then builds them like [`ShaderProgram::from_sources`].
    pub fn from_files(
        gl: &Arc<G>,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
        geometry: Option<&Path>,
    ) -> Result<Self, ShaderError> {
        let sources = ShaderSources::read(vertex, fragment, geometry)?;
        Self::from_sources(gl, &sources)
    }

    pub fn id(&self) -> G::Program {
        self.id
    }

    /// Compile and link failures gathered while building, in build order.
    pub fn diagnostics(&self) -> &[StageDiagnostic] {
        &self.diagnostics
    }

    /// Whether every stage compiled and the program linked.
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the program only if it built cleanly.
    pub fn strict(mut self) -> Result<Self, ShaderError> {
        if self.diagnostics.is_empty() {
            Ok(self)
        } else {
            Err(ShaderError::Build(std::mem::take(&mut self.diagnostics)))
        }
    }

    /// Binds the shader program for use.
    pub fn use_program(&self) {
        self.gl.use_program(Some(self.id));
    }

    /// Sets a uniform variable in the shader program.
    pub fn set_uniform<T: Uniform>(&self, name: &str, value: T) {
        self.gl.set_uniform(self.id, name, value.uniform_value());
    }
}

impl<G: Gpu> Drop for ShaderProgram<G> {
    fn drop(&mut self) {
        self.gl.delete_program(self.id);
    }
}
