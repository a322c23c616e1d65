//! glTF 2.0 import through the `gltf` crate.
//!
//! The scene's top-level nodes become children of a synthetic root. Each triangle
//! primitive is its own mesh, so a node referencing a glTF mesh lists one mesh per
//! primitive. Node transforms are not applied.
//!
//! Only images referenced by URI can be loaded later from disk; embedded images and data
//! URIs are skipped with a warning.

use std::path::Path;

use ::gltf::image::Source;
use ::gltf::mesh::Mode;
use glam::{Vec2, Vec3, Vec4};

use super::{ImportOptions, Scene, SceneError, SceneMaterial, SceneMesh, SceneNode, TextureKind};

pub fn import(path: &Path, options: &ImportOptions) -> Result<Scene, SceneError> {
    let ::gltf::Gltf { document, blob } = ::gltf::Gltf::open(path)?;
    let buffers = ::gltf::import_buffers(&document, path.parent(), blob)?;

    let mut meshes = Vec::new();
    // scene mesh indices for every glTF mesh, one per primitive
    let mut primitives_of = Vec::new();

    for mesh in document.meshes() {
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            let name = match mesh.name() {
                Some(name) => format!("{name}#{}", primitive.index()),
                None => format!("mesh{}#{}", mesh.index(), primitive.index()),
            };
            if primitive.mode() != Mode::Triangles {
                log::warn!("skipping {name}: {:?} primitives are not supported", primitive.mode());
                continue;
            }

            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let Some(positions) = reader.read_positions() else {
                log::warn!("skipping {name}: no positions");
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
            let normals = reader
                .read_normals()
                .map(|normals| normals.map(Vec3::from).collect())
                .unwrap_or_default();
            let uvs = reader
                .read_tex_coords(0)
                .map(|uvs| uvs.into_f32().map(Vec2::from).collect());
            let indices_flat: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let mut scene_mesh = SceneMesh {
                name,
                positions,
                normals,
                uvs,
                tangents: None,
                bitangents: None,
                faces: indices_flat
                    .chunks_exact(3)
                    .map(|face| [face[0], face[1], face[2]])
                    .collect(),
                material: primitive.material().index(),
            };

            if let Some(tangents) = reader.read_tangents() {
                let tangents: Vec<Vec4> = tangents.map(Vec4::from).collect();
                if tangents.len() == scene_mesh.positions.len()
                    && scene_mesh.normals.len() == tangents.len()
                {
                    scene_mesh.bitangents = Some(
                        scene_mesh
                            .normals
                            .iter()
                            .zip(&tangents)
                            .map(|(n, t)| n.cross(t.truncate()) * t.w)
                            .collect(),
                    );
                    scene_mesh.tangents = Some(tangents.iter().map(|t| t.truncate()).collect());
                }
            }

            scene_mesh.complete(options);
            indices.push(meshes.len());
            meshes.push(scene_mesh);
        }
        primitives_of.push(indices);
    }

    let root = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .map(|scene| SceneNode {
            name: scene.name().unwrap_or("root").to_owned(),
            meshes: Vec::new(),
            children: scene.nodes().map(|node| convert_node(&node, &primitives_of)).collect(),
        });

    Ok(Scene {
        root,
        meshes,
        materials: document.materials().map(|m| convert_material(&m)).collect(),
        incomplete: false,
    }
    .finish())
}

fn convert_node(node: &::gltf::Node<'_>, primitives_of: &[Vec<usize>]) -> SceneNode {
    SceneNode {
        name: node.name().unwrap_or_default().to_owned(),
        meshes: node
            .mesh()
            .and_then(|mesh| primitives_of.get(mesh.index()))
            .cloned()
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| convert_node(&child, primitives_of))
            .collect(),
    }
}

fn convert_material(material: &::gltf::Material<'_>) -> SceneMaterial {
    let pbr = material.pbr_metallic_roughness();
    let slots = [
        (TextureKind::Diffuse, pbr.base_color_texture().map(|info| info.texture())),
        (TextureKind::Specular, pbr.metallic_roughness_texture().map(|info| info.texture())),
        (TextureKind::Normal, material.normal_texture().map(|normal| normal.texture())),
    ];

    let textures = slots
        .into_iter()
        .filter_map(|(kind, texture)| {
            let texture = texture?;
            match texture.source().source() {
                Source::Uri { uri, .. } if !uri.starts_with("data:") => Some((kind, decode_uri(uri))),
                _ => {
                    log::warn!(
                        "skipping embedded image {} of material {:?}",
                        texture.source().index(),
                        material.name().unwrap_or_default()
                    );
                    None
                }
            }
        })
        .collect();

    SceneMaterial {
        name: material.name().unwrap_or_default().to_owned(),
        textures,
    }
}

/// Percent-decodes a relative image URI into a file path.
fn decode_uri(uri: &str) -> String {
    match urlencoding::decode(uri) {
        Ok(path) => path.into_owned(),
        Err(e) => {
            log::warn!("image uri {uri:?} does not decode to utf-8 ({e}), using it as is");
            uri.to_owned()
        }
    }
}
