//! The slice of OpenGL this crate talks to.
//!
//! Every driver call made by shaders, textures and meshes goes through the [`Gpu`] trait.
//! It is implemented for [`glow::Context`], which is what a real application passes in.

use std::fmt::Debug;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use glow::HasContext as Gl;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ShaderStage {
    /// The OpenGL enum for this stage.
    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        }
    }

    /// Upper-case name used to tag diagnostics.
    pub fn tag(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
            ShaderStage::Geometry => "GEOMETRY",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Row layout of uploaded pixel data, chosen from the decoded channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Red,
    Rg,
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// Maps a channel count to a format. Returns [`None`] for counts outside `1..=4`.
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Red),
            2 => Some(PixelFormat::Rg),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rg => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Tightly packed 8-bit pixel rows ready to be uploaded.
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Store colour channels as sRGB. Ignored for one and two channel data.
    pub srgb: bool,
    pub data: &'a [u8],
}

/// A value that can be written to a uniform variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// One float vertex attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub offset: i32,
}

impl VertexAttribute {
    pub const fn new(location: u32, components: i32, offset: usize) -> Self {
        Self {
            location,
            components,
            offset: offset as i32,
        }
    }
}

/// Driver primitives for shader programs, textures and indexed meshes.
///
/// Methods that create objects return the driver's error string on failure. Compile and
/// link return the info log as the error so callers can decide what to do with it.
pub trait Gpu {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Texture: Copy + Debug + PartialEq;
    type VertexArray: Copy + Debug;
    type Buffer: Copy + Debug;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn compile_shader(&self, shader: Self::Shader, source: &str) -> Result<(), String>;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program) -> Result<(), String>;
    fn use_program(&self, program: Option<Self::Program>);
    /// Writes a uniform of the currently used program. Unknown names are ignored.
    fn set_uniform(&self, program: Self::Program, name: &str, value: UniformValue);
    fn delete_program(&self, program: Self::Program);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// Uploads pixels, builds mipmaps and sets repeat wrapping with trilinear filtering.
    fn upload_texture(&self, texture: Self::Texture, image: &TextureImage<'_>);
    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>);
    fn delete_texture(&self, texture: Self::Texture);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Fills the vertex and element buffers and records the attribute layout in `vao`.
    #[allow(clippy::too_many_arguments)]
    fn upload_mesh(
        &self,
        vao: Self::VertexArray,
        vbo: Self::Buffer,
        ebo: Self::Buffer,
        vertices: &[u8],
        stride: i32,
        attributes: &[VertexAttribute],
        indices: &[u32],
    );
    fn draw_triangles(&self, vao: Self::VertexArray, index_count: i32);
    fn delete_vertex_array(&self, vao: Self::VertexArray);
    fn delete_buffer(&self, buffer: Self::Buffer);
}

impl Gpu for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Texture = glow::Texture;
    type VertexArray = glow::VertexArray;
    type Buffer = glow::Buffer;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { Gl::create_shader(self, stage.gl_enum()) }
    }

    fn compile_shader(&self, shader: Self::Shader, source: &str) -> Result<(), String> {
        unsafe {
            Gl::shader_source(self, shader, source);
            Gl::compile_shader(self, shader);
            if Gl::get_shader_compile_status(self, shader) {
                Ok(())
            } else {
                Err(Gl::get_shader_info_log(self, shader))
            }
        }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { Gl::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { Gl::create_program(self) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { Gl::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { Gl::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) -> Result<(), String> {
        unsafe {
            Gl::link_program(self, program);
            if Gl::get_program_link_status(self, program) {
                Ok(())
            } else {
                Err(Gl::get_program_info_log(self, program))
            }
        }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { Gl::use_program(self, program) }
    }

    fn set_uniform(&self, program: Self::Program, name: &str, value: UniformValue) {
        unsafe {
            let Some(loc) = Gl::get_uniform_location(self, program, name) else {
                return;
            };
            let loc = Some(&loc);
            match value {
                UniformValue::Bool(v) => Gl::uniform_1_i32(self, loc, v as i32),
                UniformValue::Int(v) => Gl::uniform_1_i32(self, loc, v),
                UniformValue::Float(v) => Gl::uniform_1_f32(self, loc, v),
                UniformValue::Vec2(v) => Gl::uniform_2_f32(self, loc, v.x, v.y),
                UniformValue::Vec3(v) => Gl::uniform_3_f32(self, loc, v.x, v.y, v.z),
                UniformValue::Vec4(v) => Gl::uniform_4_f32(self, loc, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => {
                    Gl::uniform_matrix_3_f32_slice(self, loc, false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    Gl::uniform_matrix_4_f32_slice(self, loc, false, &m.to_cols_array())
                }
            }
        }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { Gl::delete_program(self, program) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { Gl::create_texture(self) }
    }

    fn upload_texture(&self, texture: Self::Texture, image: &TextureImage<'_>) {
        let (format, internal_format) = match (image.format, image.srgb) {
            (PixelFormat::Red, _) => (glow::RED, glow::R8),
            (PixelFormat::Rg, _) => (glow::RG, glow::RG8),
            (PixelFormat::Rgb, false) => (glow::RGB, glow::RGB8),
            (PixelFormat::Rgb, true) => (glow::RGB, glow::SRGB8),
            (PixelFormat::Rgba, false) => (glow::RGBA, glow::RGBA8),
            (PixelFormat::Rgba, true) => (glow::RGBA, glow::SRGB8_ALPHA8),
        };
        unsafe {
            Gl::bind_texture(self, glow::TEXTURE_2D, Some(texture));
            // rows of 1 and 3 channel images are not 4-byte aligned
            Gl::pixel_store_i32(self, glow::UNPACK_ALIGNMENT, 1);
            Gl::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                internal_format as i32,
                image.width as i32,
                image.height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(image.data)),
            );
            Gl::pixel_store_i32(self, glow::UNPACK_ALIGNMENT, 4);
            Gl::generate_mipmap(self, glow::TEXTURE_2D);
            Gl::tex_parameter_i32(
                self,
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::REPEAT as i32,
            );
            Gl::tex_parameter_i32(
                self,
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::REPEAT as i32,
            );
            Gl::tex_parameter_i32(
                self,
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            Gl::tex_parameter_i32(
                self,
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            Gl::bind_texture(self, glow::TEXTURE_2D, None);
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>) {
        unsafe {
            Gl::active_texture(self, glow::TEXTURE0 + unit);
            Gl::bind_texture(self, glow::TEXTURE_2D, texture);
        }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { Gl::delete_texture(self, texture) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { Gl::create_vertex_array(self) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { Gl::create_buffer(self) }
    }

    fn upload_mesh(
        &self,
        vao: Self::VertexArray,
        vbo: Self::Buffer,
        ebo: Self::Buffer,
        vertices: &[u8],
        stride: i32,
        attributes: &[VertexAttribute],
        indices: &[u32],
    ) {
        unsafe {
            Gl::bind_vertex_array(self, Some(vao));

            Gl::bind_buffer(self, glow::ARRAY_BUFFER, Some(vbo));
            Gl::buffer_data_u8_slice(self, glow::ARRAY_BUFFER, vertices, glow::STATIC_DRAW);

            Gl::bind_buffer(self, glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            Gl::buffer_data_u8_slice(
                self,
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(indices),
                glow::STATIC_DRAW,
            );

            for attribute in attributes {
                Gl::enable_vertex_attrib_array(self, attribute.location);
                Gl::vertex_attrib_pointer_f32(
                    self,
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    stride,
                    attribute.offset,
                );
            }

            Gl::bind_vertex_array(self, None);
            Gl::bind_buffer(self, glow::ARRAY_BUFFER, None);
        }
    }

    fn draw_triangles(&self, vao: Self::VertexArray, index_count: i32) {
        unsafe {
            Gl::bind_vertex_array(self, Some(vao));
            Gl::draw_elements(self, glow::TRIANGLES, index_count, glow::UNSIGNED_INT, 0);
            Gl::bind_vertex_array(self, None);
        }
    }

    fn delete_vertex_array(&self, vao: Self::VertexArray) {
        unsafe { Gl::delete_vertex_array(self, vao) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { Gl::delete_buffer(self, buffer) }
    }
}
