//! Format-neutral scene data produced by the importers.
//!
//! An importer turns a file into a [`Scene`]: a tree of [`SceneNode`]s referencing
//! [`SceneMesh`]es by index, plus the [`SceneMaterial`]s those meshes use. [`import`] picks
//! the importer from the file extension and rejects scenes that are unusable.

use std::path::Path;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod geometry;
pub mod gltf;
pub mod obj;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unsupported scene format {0:?}")]
    UnsupportedFormat(String),
    #[error("obj: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("gltf: {0}")]
    Gltf(#[from] ::gltf::Error),
    #[error("scene is incomplete: it contains no meshes")]
    Incomplete,
    #[error("scene has no root node")]
    MissingRoot,
}

/// Options passed to the importers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Produce texture coordinates with a top-left origin.
    pub flip_uvs: bool,
    /// Generate tangents and bitangents where the file has none.
    pub calc_tangent_space: bool,
    /// Treat diffuse textures as sRGB encoded.
    pub gamma: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            flip_uvs: true,
            calc_tangent_space: true,
            gamma: false,
        }
    }
}

/// Semantic role of a texture within a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureKind {
    /// Every slot, in the order meshes resolve them.
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Normal,
        TextureKind::Height,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Sampler uniform prefix, `texture_diffuse` and so on. Samplers are numbered from 1.
    pub fn sampler_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Normal => "texture_normal",
            TextureKind::Height => "texture_height",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Indices into [`Scene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

/// Per-vertex attribute arrays of one triangle mesh.
///
/// Optional arrays are either absent or as long as `positions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Option<Vec<Vec2>>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
    pub faces: Vec<[u32; 3]>,
    pub material: Option<usize>,
}

impl SceneMesh {
    /// Fills in normals and tangent frames the file did not provide.
    pub(crate) fn complete(&mut self, options: &ImportOptions) {
        if self.normals.len() != self.positions.len() {
            if !self.normals.is_empty() {
                log::warn!("mesh {:?} has a short normal array, regenerating", self.name);
            }
            self.normals = geometry::smooth_normals(&self.positions, &self.faces);
        }
        if options.calc_tangent_space && self.tangents.is_none() {
            if let Some(uvs) = &self.uvs {
                let (tangents, bitangents) =
                    geometry::tangent_frames(&self.positions, &self.normals, uvs, &self.faces);
                self.tangents = Some(tangents);
                self.bitangents = Some(bitangents);
            }
        }
    }
}

/// Texture file references of a material, by slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMaterial {
    pub name: String,
    pub textures: Vec<(TextureKind, String)>,
}

impl SceneMaterial {
    /// File names declared for `kind`, in declaration order.
    pub fn textures(&self, kind: TextureKind) -> impl Iterator<Item = &str> {
        self.textures
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, path)| path.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub root: Option<SceneNode>,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    /// Set when the importer produced no usable mesh data.
    pub incomplete: bool,
}

impl Scene {
    /// Marks the scene incomplete when there is nothing to render.
    pub(crate) fn finish(mut self) -> Self {
        self.incomplete = self.meshes.is_empty();
        self
    }

    /// Rejects incomplete scenes and scenes without a root.
    pub fn validate(self) -> Result<Self, SceneError> {
        if self.incomplete {
            return Err(SceneError::Incomplete);
        }
        if self.root.is_none() {
            return Err(SceneError::MissingRoot);
        }
        Ok(self)
    }
}

/// Imports the file at `path`, choosing the importer by extension.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Scene, SceneError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let scene = match extension.as_str() {
        "obj" => obj::import(path, options)?,
        "gltf" | "glb" => self::gltf::import(path, options)?,
        _ => return Err(SceneError::UnsupportedFormat(extension)),
    };
    scene.validate()
}
