//! Structs and functions for handling textures.
//!
//! The module provides the [`Texture`] struct which is a CPU representation of a GPU texture.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use thiserror::Error;

use super::gpu::{Gpu, PixelFormat, TextureImage};
use crate::scene::TextureKind;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode texture {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("graphics driver error: {0}")]
    Driver(String),
}

/// Represents a texture stored on the GPU side.
///
/// The GPU object is deleted on drop. Models share textures through [`Arc`], so it lives as
/// long as the last mesh using it.
pub struct Texture<G: Gpu = glow::Context> {
    gl: Arc<G>,
    id: G::Texture,
    kind: TextureKind,
    path: String,
    width: u32,
    height: u32,
    populated: bool,
}

impl<G: Gpu> Texture<G> {
    /// Creates a new texture from the given [`image::DynamicImage`].
    ///
    /// `path` is the name the texture is known by, usually what a material referenced.
    pub fn new(
        gl: &Arc<G>,
        image: &DynamicImage,
        kind: TextureKind,
        path: impl Into<String>,
        srgb: bool,
    ) -> Result<Self, TextureError> {
        let (width, height) = image.dimensions();
        let (format, data) = pixel_rows(image);
        let id = gl.create_texture().map_err(TextureError::Driver)?;
        gl.upload_texture(
            id,
            &TextureImage {
                width,
                height,
                format,
                srgb,
                data: &data,
            },
        );

        Ok(Self {
            gl: Arc::clone(gl),
            id,
            kind,
            path: path.into(),
            width,
            height,
            populated: true,
        })
    }

    /// Decodes `file` and uploads it.
    pub fn from_file(
        gl: &Arc<G>,
        file: &Path,
        kind: TextureKind,
        path: impl Into<String>,
        srgb: bool,
    ) -> Result<Self, TextureError> {
        let image = image::open(file).map_err(|source| TextureError::Decode {
            path: file.to_path_buf(),
            source,
        })?;
        log::debug!(
            "decoded {} ({}x{}, {:?})",
            file.display(),
            image.width(),
            image.height(),
            image.color()
        );
        Self::new(gl, &image, kind, path, srgb)
    }

    /// Creates the GPU object without giving it any pixels.
    ///
    /// Used in place of a texture that could not be decoded so meshes keep their slots.
    pub fn unpopulated(
        gl: &Arc<G>,
        kind: TextureKind,
        path: impl Into<String>,
    ) -> Result<Self, TextureError> {
        let id = gl.create_texture().map_err(TextureError::Driver)?;
        Ok(Self {
            gl: Arc::clone(gl),
            id,
            kind,
            path: path.into(),
            width: 0,
            height: 0,
            populated: false,
        })
    }

    pub fn id(&self) -> G::Texture {
        self.id
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// The file name this texture was loaded under.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the width of the texture.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the texture.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether pixel data was uploaded.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Binds the texture to the specified texture unit.
    pub fn bind(&self, unit: u32) {
        self.gl.bind_texture(unit, Some(self.id));
    }
}

impl<G: Gpu> std::fmt::Debug for Texture<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("populated", &self.populated)
            .finish()
    }
}

impl<G: Gpu> Drop for Texture<G> {
    fn drop(&mut self) {
        self.gl.delete_texture(self.id);
    }
}

/// Picks the upload format from the channel count and returns matching 8-bit rows.
fn pixel_rows(image: &DynamicImage) -> (PixelFormat, Vec<u8>) {
    match image.color().channel_count() {
        1 => (PixelFormat::Red, image.to_luma8().into_raw()),
        2 => (PixelFormat::Rg, image.to_luma_alpha8().into_raw()),
        3 => (PixelFormat::Rgb, image.to_rgb8().into_raw()),
        _ => (PixelFormat::Rgba, image.to_rgba8().into_raw()),
    }
}
