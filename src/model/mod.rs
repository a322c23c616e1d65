//! Model loading.
//!
//! A [`Model`] is built in one pass: import the scene, walk its node tree depth-first, turn
//! every referenced scene mesh into a [`Mesh`], and resolve material textures through a
//! per-model cache keyed by file path so each file is decoded and uploaded once.
//!
//! [`Model::load`] fails on the first problem. [`Model::load_or_empty`] keeps going instead:
//! an unreadable scene gives an empty model, and an undecodable texture gives a texture
//! handle without pixels. What was skipped is listed in [`Model::issues`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fxhash::FxHashMap;
use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::abs::{Gpu, ShaderProgram, Texture, TextureError};
use crate::scene::{self, ImportOptions, Scene, SceneError, SceneMaterial, SceneMesh, SceneNode, TextureKind};

pub mod mesh;

pub use mesh::*;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to import {}: {source}", .path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: SceneError,
    },
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error("graphics driver error: {0}")]
    Driver(String),
}

/// Something [`Model::load_or_empty`] skipped over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadIssue {
    /// The scene could not be imported; the model is empty.
    Import { path: PathBuf, message: String },
    /// A texture could not be decoded; its handle holds no pixels.
    Texture { path: PathBuf, message: String },
    /// The driver refused to create a GPU object; the mesh was left out.
    Driver { mesh: String, message: String },
}

impl std::fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadIssue::Import { path, message } => {
                write!(f, "scene {} not imported: {message}", path.display())
            }
            LoadIssue::Texture { path, message } => {
                write!(f, "texture {} not loaded: {message}", path.display())
            }
            LoadIssue::Driver { mesh, message } => {
                write!(f, "mesh {mesh:?} not uploaded: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPolicy {
    Strict,
    Lenient,
}

pub struct Model<G: Gpu = glow::Context> {
    meshes: Vec<Mesh<G>>,
    directory: PathBuf,
    textures_loaded: FxHashMap<String, Arc<Texture<G>>>,
    issues: Vec<LoadIssue>,
}

impl<G: Gpu> Model<G> {
    /// Loads the scene at `path`, failing on import, texture or driver errors.
    pub fn load(gl: &Arc<G>, path: impl AsRef<Path>, options: &ImportOptions) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let scene = scene::import(path, options).map_err(|source| ModelError::Import {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Loader::new(gl, base_directory(path), options, LoadPolicy::Strict).run(&scene)?;
        log::info!(
            "loaded {}: {} meshes, {} textures",
            path.display(),
            model.meshes.len(),
            model.textures_loaded.len()
        );
        Ok(model)
    }

    /// Loads the scene at `path`, degrading instead of failing.
    ///
    /// Import failures yield a model with no meshes; texture decode failures yield
    /// unpopulated textures; meshes the driver fails to upload are left out. All of these
    /// are logged and recorded in [`Model::issues`].
    pub fn load_or_empty(gl: &Arc<G>, path: impl AsRef<Path>, options: &ImportOptions) -> Self {
        let path = path.as_ref();
        let scene = match scene::import(path, options) {
            Ok(scene) => scene,
            Err(source) => {
                let err = ModelError::Import {
                    path: path.to_path_buf(),
                    source,
                };
                log::error!("{err}");
                return Self {
                    meshes: Vec::new(),
                    directory: base_directory(path),
                    textures_loaded: FxHashMap::default(),
                    issues: vec![LoadIssue::Import {
                        path: path.to_path_buf(),
                        message: error_chain(&err),
                    }],
                };
            }
        };

        let mut loader = Loader::new(gl, base_directory(path), options, LoadPolicy::Lenient);
        if let Some(root) = &scene.root {
            loader.visit_lenient(root, &scene);
        }
        let model = loader.model;
        log::info!(
            "loaded {}: {} meshes, {} textures, {} issues",
            path.display(),
            model.meshes.len(),
            model.textures_loaded.len(),
            model.issues.len()
        );
        model
    }

    /// Builds a model from an already imported scene. Texture paths resolve against `directory`.
    pub fn from_scene(
        gl: &Arc<G>,
        scene: &Scene,
        directory: impl Into<PathBuf>,
        options: &ImportOptions,
    ) -> Result<Self, ModelError> {
        Loader::new(gl, directory.into(), options, LoadPolicy::Strict).run(scene)
    }

    /// Meshes in node traversal order.
    pub fn meshes(&self) -> &[Mesh<G>] {
        &self.meshes
    }

    /// Directory texture paths are resolved against.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Every texture loaded for this model, keyed by normalized file path.
    pub fn textures_loaded(&self) -> &FxHashMap<String, Arc<Texture<G>>> {
        &self.textures_loaded
    }

    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// Draws every mesh with `shader`, which must be in use.
    pub fn draw(&self, shader: &ShaderProgram<G>) {
        for mesh in &self.meshes {
            mesh.draw(shader);
        }
    }
}

impl<G: Gpu> std::fmt::Debug for Model<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("meshes", &self.meshes)
            .field("directory", &self.directory)
            .field("issues", &self.issues)
            .finish()
    }
}

struct Loader<'a, G: Gpu> {
    gl: &'a Arc<G>,
    policy: LoadPolicy,
    gamma: bool,
    model: Model<G>,
}

impl<'a, G: Gpu> Loader<'a, G> {
    fn new(gl: &'a Arc<G>, directory: PathBuf, options: &ImportOptions, policy: LoadPolicy) -> Self {
        Self {
            gl,
            policy,
            gamma: options.gamma,
            model: Model {
                meshes: Vec::new(),
                directory,
                textures_loaded: FxHashMap::default(),
                issues: Vec::new(),
            },
        }
    }

    fn run(mut self, scene: &Scene) -> Result<Model<G>, ModelError> {
        if let Some(root) = &scene.root {
            self.process_node(root, scene)?;
        }
        Ok(self.model)
    }

    /// Walks like [`Loader::process_node`] but leaves out meshes that fail to build.
    fn visit_lenient(&mut self, node: &SceneNode, scene: &Scene) {
        for &index in &node.meshes {
            let Some(source) = scene.meshes.get(index) else {
                log::warn!("node {:?} references missing mesh {index}", node.name);
                continue;
            };
            match self.process_mesh(source, scene) {
                Ok(mesh) => self.model.meshes.push(mesh),
                Err(err) => {
                    log::error!("mesh {:?} left out: {err}", source.name);
                    self.model.issues.push(LoadIssue::Driver {
                        mesh: source.name.clone(),
                        message: error_chain(&err),
                    });
                }
            }
        }

        for child in &node.children {
            self.visit_lenient(child, scene);
        }
    }

    fn process_node(&mut self, node: &SceneNode, scene: &Scene) -> Result<(), ModelError> {
        for &index in &node.meshes {
            let Some(source) = scene.meshes.get(index) else {
                log::warn!("node {:?} references missing mesh {index}", node.name);
                continue;
            };
            let mesh = self.process_mesh(source, scene)?;
            self.model.meshes.push(mesh);
        }

        for child in &node.children {
            self.process_node(child, scene)?;
        }
        Ok(())
    }

    fn process_mesh(&mut self, source: &SceneMesh, scene: &Scene) -> Result<Mesh<G>, ModelError> {
        let attribute = |values: Option<&Vec<Vec3>>, i: usize| -> Vec3 {
            values.and_then(|values| values.get(i)).copied().unwrap_or(Vec3::ZERO)
        };

        let vertices = source
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                normal: attribute(Some(&source.normals), i),
                tex_coords: source
                    .uvs
                    .as_ref()
                    .and_then(|uvs| uvs.get(i))
                    .copied()
                    .unwrap_or(Vec2::ZERO),
                tangent: attribute(source.tangents.as_ref(), i),
                bitangent: attribute(source.bitangents.as_ref(), i),
            })
            .collect();

        let indices = source.faces.iter().flatten().copied().collect();

        let mut textures = Vec::new();
        if let Some(material) = source.material.and_then(|i| scene.materials.get(i)) {
            for kind in TextureKind::ALL {
                let mut maps = self.load_material_textures(material, kind)?;
                textures.append(&mut maps);
            }
        }

        log::debug!(
            "mesh {:?}: {} vertices, {} faces, {} textures",
            source.name,
            source.positions.len(),
            source.faces.len(),
            textures.len()
        );
        Mesh::new(self.gl, vertices, indices, textures).map_err(ModelError::Driver)
    }

    fn load_material_textures(
        &mut self,
        material: &SceneMaterial,
        kind: TextureKind,
    ) -> Result<Vec<Arc<Texture<G>>>, ModelError> {
        let mut textures = Vec::new();
        for file in material.textures(kind) {
            let key = normalize_texture_path(file);
            if let Some(texture) = self.model.textures_loaded.get(&key) {
                textures.push(Arc::clone(texture));
                continue;
            }

            let texture = Arc::new(self.load_texture(file, &key, kind)?);
            self.model.textures_loaded.insert(key, Arc::clone(&texture));
            textures.push(texture);
        }
        Ok(textures)
    }

    fn load_texture(&mut self, file: &str, key: &str, kind: TextureKind) -> Result<Texture<G>, ModelError> {
        let full_path = self.model.directory.join(key);
        let srgb = self.gamma && kind == TextureKind::Diffuse;

        match Texture::from_file(self.gl, &full_path, kind, file, srgb) {
            Ok(texture) => Ok(texture),
            Err(TextureError::Decode { path, source }) if self.policy == LoadPolicy::Lenient => {
                log::error!("texture failed to load at path {}: {source}", path.display());
                self.model.issues.push(LoadIssue::Texture {
                    path,
                    message: source.to_string(),
                });
                Ok(Texture::unpopulated(self.gl, kind, file)?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// The directory containing `path`, or `.` for a bare file name.
fn base_directory(path: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Cache key for a material texture reference: forward slashes, no leading `./`.
fn normalize_texture_path(file: &str) -> String {
    let mut path = file.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_owned();
    }
    path
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
