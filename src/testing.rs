//! Test doubles shared by the unit tests.
//!
//! [`RecordingGpu`] stands in for a GL context: it hands out integer handles, keeps track
//! of which objects are alive and records the calls tests want to assert on.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use fxhash::{FxHashMap, FxHashSet};

use crate::abs::{Gpu, PixelFormat, ShaderStage, TextureImage, UniformValue, VertexAttribute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upload {
    pub texture: u32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub srgb: bool,
    pub bytes: usize,
}

#[derive(Debug, Default)]
pub struct RecordingGpu {
    next_id: Cell<u32>,
    shader_stages: RefCell<FxHashMap<u32, ShaderStage>>,
    shader_ok: RefCell<FxHashMap<u32, bool>>,
    attached: RefCell<FxHashMap<u32, Vec<u32>>>,

    pub live_shaders: RefCell<FxHashSet<u32>>,
    pub live_programs: RefCell<FxHashSet<u32>>,
    pub live_textures: RefCell<FxHashSet<u32>>,
    pub live_buffers: RefCell<FxHashSet<u32>>,
    pub live_vertex_arrays: RefCell<FxHashSet<u32>>,

    pub compiled_stages: RefCell<Vec<(ShaderStage, String)>>,
    pub current_program: Cell<Option<u32>>,
    pub uniforms: RefCell<Vec<(u32, String, UniformValue)>>,
    pub uploads: RefCell<Vec<Upload>>,
    pub bound_textures: RefCell<Vec<(u32, Option<u32>)>>,
    /// Index count of every mesh upload.
    pub mesh_uploads: RefCell<Vec<usize>>,
    /// Index count of every draw call.
    pub draws: RefCell<Vec<i32>>,
    /// Buffers left to hand out before `create_buffer` starts failing. Unlimited when unset.
    pub buffer_budget: Cell<Option<u32>>,
}

impl RecordingGpu {
    fn allocate(&self, live: &RefCell<FxHashSet<u32>>) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        live.borrow_mut().insert(id);
        id
    }

    fn release(live: &RefCell<FxHashSet<u32>>, id: u32) {
        assert!(live.borrow_mut().remove(&id), "object {id} released twice");
    }
}

/// Rejects sources without an entry point or with unbalanced braces.
fn check_source(source: &str) -> Result<(), String> {
    if !source.contains("void main") {
        return Err("0:1(1): error: no entry point `main`".to_owned());
    }
    let mut depth = 0i32;
    for (line, text) in source.lines().enumerate() {
        for c in text.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(format!("0:{}(1): error: unexpected `}}`", line + 1));
            }
        }
    }
    if depth != 0 {
        return Err(format!("0:{}(1): error: syntax error, unexpected end of file", source.lines().count()));
    }
    Ok(())
}

impl Gpu for RecordingGpu {
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type VertexArray = u32;
    type Buffer = u32;

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let shader = self.allocate(&self.live_shaders);
        self.shader_stages.borrow_mut().insert(shader, stage);
        Ok(shader)
    }

    fn compile_shader(&self, shader: u32, source: &str) -> Result<(), String> {
        if let Some(&stage) = self.shader_stages.borrow().get(&shader) {
            self.compiled_stages.borrow_mut().push((stage, source.to_owned()));
        }
        let result = check_source(source);
        self.shader_ok.borrow_mut().insert(shader, result.is_ok());
        result
    }

    fn delete_shader(&self, shader: u32) {
        Self::release(&self.live_shaders, shader);
    }

    fn create_program(&self) -> Result<u32, String> {
        Ok(self.allocate(&self.live_programs))
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.attached.borrow_mut().entry(program).or_default().push(shader);
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        if let Some(shaders) = self.attached.borrow_mut().get_mut(&program) {
            shaders.retain(|&s| s != shader);
        }
    }

    fn link_program(&self, program: u32) -> Result<(), String> {
        let attached = self.attached.borrow();
        let shader_ok = self.shader_ok.borrow();
        let shaders = attached.get(&program).map(Vec::as_slice).unwrap_or_default();
        if shaders.iter().all(|s| shader_ok.get(s).copied().unwrap_or(false)) {
            Ok(())
        } else {
            Err("error: linking with uncompiled/unspecialized shader".to_owned())
        }
    }

    fn use_program(&self, program: Option<u32>) {
        self.current_program.set(program);
    }

    fn set_uniform(&self, program: u32, name: &str, value: UniformValue) {
        self.uniforms.borrow_mut().push((program, name.to_owned(), value));
    }

    fn delete_program(&self, program: u32) {
        Self::release(&self.live_programs, program);
        self.attached.borrow_mut().remove(&program);
    }

    fn create_texture(&self) -> Result<u32, String> {
        Ok(self.allocate(&self.live_textures))
    }

    fn upload_texture(&self, texture: u32, image: &TextureImage<'_>) {
        self.uploads.borrow_mut().push(Upload {
            texture,
            width: image.width,
            height: image.height,
            format: image.format,
            srgb: image.srgb,
            bytes: image.data.len(),
        });
    }

    fn bind_texture(&self, unit: u32, texture: Option<u32>) {
        self.bound_textures.borrow_mut().push((unit, texture));
    }

    fn delete_texture(&self, texture: u32) {
        Self::release(&self.live_textures, texture);
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        Ok(self.allocate(&self.live_vertex_arrays))
    }

    fn create_buffer(&self) -> Result<u32, String> {
        match self.buffer_budget.get() {
            Some(0) => return Err("out of memory".to_owned()),
            Some(left) => self.buffer_budget.set(Some(left - 1)),
            None => {}
        }
        Ok(self.allocate(&self.live_buffers))
    }

    fn upload_mesh(
        &self,
        _vao: u32,
        _vbo: u32,
        _ebo: u32,
        vertices: &[u8],
        stride: i32,
        _attributes: &[VertexAttribute],
        indices: &[u32],
    ) {
        assert_eq!(vertices.len() % stride as usize, 0, "partial vertex uploaded");
        self.mesh_uploads.borrow_mut().push(indices.len());
    }

    fn draw_triangles(&self, _vao: u32, index_count: i32) {
        self.draws.borrow_mut().push(index_count);
    }

    fn delete_vertex_array(&self, vao: u32) {
        Self::release(&self.live_vertex_arrays, vao);
    }

    fn delete_buffer(&self, buffer: u32) {
        Self::release(&self.live_buffers, buffer);
    }
}

/// Writes a one-triangle glTF scene into `dir` and returns the path of the `.gltf` file.
///
/// Node `parent` and its child `child` both instance mesh `tri`, whose material `paint`
/// uses `albedo.png` as base colour. The image itself is not written.
pub fn write_gltf_triangle(dir: &Path) -> PathBuf {
    let mut bin = Vec::with_capacity(44);
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    std::fs::write(dir.join("tri.bin"), &bin).unwrap();

    let document = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "name": "main", "nodes": [0] }],
        "nodes": [
            { "name": "parent", "mesh": 0, "children": [1] },
            { "name": "child", "mesh": 0 }
        ],
        "meshes": [{
            "name": "tri",
            "primitives": [{
                "attributes": { "POSITION": 0 },
                "indices": 1,
                "material": 0
            }]
        }],
        "materials": [{
            "name": "paint",
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
        }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": "albedo.png" }],
        "buffers": [{ "uri": "tri.bin", "byteLength": bin.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            },
            {
                "bufferView": 1,
                "componentType": 5123,
                "count": 3,
                "type": "SCALAR"
            }
        ]
    });

    let path = dir.join("tri.gltf");
    std::fs::write(&path, serde_json::to_vec_pretty(&document).unwrap()).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_checks() {
        assert!(check_source("void main() {}").is_ok());
        assert!(check_source("void main() {").is_err());
        assert!(check_source("void entry() {}").is_err());
        assert!(check_source("void main() }{").is_err());
    }
}
