//! Wavefront OBJ import through `tobj`.
//!
//! Every OBJ object becomes one mesh hanging off a single root node. Material slots follow
//! the usual MTL conventions: `map_Kd` is diffuse, `map_Ks` specular, `norm` normal and
//! `map_Bump`/`bump` height.

use std::path::Path;

use glam::{Vec2, Vec3};

use super::{ImportOptions, Scene, SceneError, SceneMaterial, SceneMesh, SceneNode, TextureKind};

pub fn import(path: &Path, options: &ImportOptions) -> Result<Scene, SceneError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
    )?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!("no usable materials for {}: {e}", path.display());
        Vec::new()
    });

    let mut root = SceneNode {
        name: path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        ..Default::default()
    };
    let mut meshes = Vec::with_capacity(models.len());

    for model in models {
        let mut mesh = convert_mesh(&model, options);
        mesh.material = mesh.material.filter(|&id| id < materials.len());
        mesh.complete(options);

        root.children.push(SceneNode {
            name: model.name,
            meshes: vec![meshes.len()],
            children: Vec::new(),
        });
        meshes.push(mesh);
    }

    Ok(Scene {
        root: Some(root),
        meshes,
        materials: materials.iter().map(convert_material).collect(),
        incomplete: false,
    }
    .finish())
}

fn convert_mesh(model: &tobj::Model, options: &ImportOptions) -> SceneMesh {
    let source = &model.mesh;
    let uvs = (!source.texcoords.is_empty()).then(|| {
        source
            .texcoords
            .chunks_exact(2)
            .map(|uv| {
                if options.flip_uvs {
                    Vec2::new(uv[0], 1.0 - uv[1])
                } else {
                    Vec2::new(uv[0], uv[1])
                }
            })
            .collect()
    });

    SceneMesh {
        name: model.name.clone(),
        positions: source.positions.chunks_exact(3).map(Vec3::from_slice).collect(),
        normals: source.normals.chunks_exact(3).map(Vec3::from_slice).collect(),
        uvs,
        tangents: None,
        bitangents: None,
        faces: source
            .indices
            .chunks_exact(3)
            .map(|face| [face[0], face[1], face[2]])
            .collect(),
        material: source.material_id,
    }
}

fn convert_material(material: &tobj::Material) -> SceneMaterial {
    let mut textures = Vec::new();
    let mut push = |kind: TextureKind, map: Option<&String>| {
        if let Some(file) = map.and_then(|map| texture_file(map)) {
            textures.push((kind, file.to_owned()));
        }
    };

    push(TextureKind::Diffuse, material.diffuse_texture.as_ref());
    push(TextureKind::Specular, material.specular_texture.as_ref());
    push(TextureKind::Normal, material.unknown_param.get("norm"));
    push(TextureKind::Height, material.normal_texture.as_ref());

    SceneMaterial {
        name: material.name.clone(),
        textures,
    }
}

/// Strips MTL map options such as `-bm 0.5` and returns the file name.
fn texture_file(map: &str) -> Option<&str> {
    let map = map.trim();
    if map.starts_with('-') {
        map.split_whitespace().last()
    } else {
        Some(map).filter(|map| !map.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJ: &str = "\
mtllib scene.mtl
o first
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
usemtl stone
f 1/1/1 2/2/1 3/3/1
o second
v 0 0 1
v 1 0 1
v 0 1 1
usemtl stone
f 4/1/1 5/2/1 6/3/1
";

    const MTL: &str = "\
newmtl stone
Kd 1 1 1
map_Kd stone_diffuse.png
map_Ks stone_specular.png
norm stone_normal.png
map_Bump -bm 0.5 stone_height.png
";

    fn write_scene(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("scene.obj");
        std::fs::write(&path, OBJ).unwrap();
        std::fs::write(dir.join("scene.mtl"), MTL).unwrap();
        path
    }

    #[test]
    fn objects_become_children_of_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let scene = import(&write_scene(dir.path()), &ImportOptions::default()).unwrap();

        let root = scene.root.as_ref().unwrap();
        assert_eq!(root.name, "scene");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name, "first");
        assert_eq!(root.children[0].meshes, [0]);
        assert_eq!(root.children[1].meshes, [1]);

        let first = &scene.meshes[0];
        assert_eq!(first.positions.len(), 3);
        assert_eq!(first.faces, [[0, 1, 2]]);
        assert_eq!(first.normals, vec![Vec3::Z; 3]);
        assert!(!scene.incomplete);
    }

    #[test]
    fn uvs_are_flipped_and_tangents_generated() {
        let dir = tempfile::tempdir().unwrap();
        let scene = import(&write_scene(dir.path()), &ImportOptions::default()).unwrap();

        let mesh = &scene.meshes[0];
        assert_eq!(mesh.uvs.as_ref().unwrap()[0], Vec2::new(0.0, 1.0));
        let tangents = mesh.tangents.as_ref().unwrap();
        let bitangents = mesh.bitangents.as_ref().unwrap();
        assert!(tangents[0].abs_diff_eq(Vec3::X, 1e-6));
        // v runs downwards once flipped
        assert!(bitangents[0].abs_diff_eq(-Vec3::Y, 1e-6));
    }

    #[test]
    fn unflipped_uvs_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let options = ImportOptions {
            flip_uvs: false,
            calc_tangent_space: false,
            ..Default::default()
        };
        let scene = import(&write_scene(dir.path()), &options).unwrap();

        assert_eq!(scene.meshes[0].uvs.as_ref().unwrap()[0], Vec2::ZERO);
        assert!(scene.meshes[0].tangents.is_none());
    }

    #[test]
    fn material_maps_fill_all_four_slots() {
        let dir = tempfile::tempdir().unwrap();
        let scene = import(&write_scene(dir.path()), &ImportOptions::default()).unwrap();

        assert_eq!(scene.meshes[0].material, Some(0));
        let material = &scene.materials[0];
        assert_eq!(material.name, "stone");
        let slot = |kind| material.textures(kind).collect::<Vec<_>>();
        assert_eq!(slot(TextureKind::Diffuse), ["stone_diffuse.png"]);
        assert_eq!(slot(TextureKind::Specular), ["stone_specular.png"]);
        assert_eq!(slot(TextureKind::Normal), ["stone_normal.png"]);
        assert_eq!(slot(TextureKind::Height), ["stone_height.png"]);
    }

    #[test]
    fn missing_mtl_still_loads_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.obj");
        std::fs::write(&path, OBJ).unwrap();

        let scene = import(&path, &ImportOptions::default()).unwrap();
        assert_eq!(scene.meshes.len(), 2);
        assert!(scene.materials.is_empty());
        assert_eq!(scene.meshes[0].material, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = import(&dir.path().join("nothing.obj"), &ImportOptions::default());
        assert!(matches!(result, Err(SceneError::Obj(_))));
    }

    #[test]
    fn map_options_are_stripped() {
        assert_eq!(texture_file("-bm 0.5 bump.png"), Some("bump.png"));
        assert_eq!(texture_file(" albedo.png "), Some("albedo.png"));
        assert_eq!(texture_file(""), None);
    }
}
