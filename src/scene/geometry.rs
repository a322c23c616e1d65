//! Normal and tangent-space generation for importers that leave them out.
//!
//! Faces referencing vertices out of range are skipped rather than trusted.

use glam::{Vec2, Vec3};

fn face_vertices(face: &[u32; 3], count: usize) -> Option<[usize; 3]> {
    let [a, b, c] = face.map(|i| i as usize);
    (a < count && b < count && c < count).then_some([a, b, c])
}

/// Area-weighted vertex normals. Vertices touched by no face get a zero normal.
pub fn smooth_normals(positions: &[Vec3], faces: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for face in faces {
        let Some([a, b, c]) = face_vertices(face, positions.len()) else {
            continue;
        };
        let weighted = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += weighted;
        normals[b] += weighted;
        normals[c] += weighted;
    }
    normals.iter_mut().for_each(|n| *n = n.normalize_or_zero());
    normals
}

/// Per-vertex tangents and bitangents from positions and texture coordinates.
///
/// Tangents are made orthogonal to the vertex normal. Faces with degenerate texture mapping
/// contribute nothing, so their vertices may end up with zero vectors.
pub fn tangent_frames(
    positions: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    faces: &[[u32; 3]],
) -> (Vec<Vec3>, Vec<Vec3>) {
    let count = positions.len().min(uvs.len());
    let mut tangents = vec![Vec3::ZERO; positions.len()];
    let mut bitangents = vec![Vec3::ZERO; positions.len()];

    for face in faces {
        let Some([a, b, c]) = face_vertices(face, count) else {
            continue;
        };
        let edge1 = positions[b] - positions[a];
        let edge2 = positions[c] - positions[a];
        let duv1 = uvs[b] - uvs[a];
        let duv2 = uvs[c] - uvs[a];

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = det.recip();
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    for (i, (tangent, bitangent)) in tangents.iter_mut().zip(bitangents.iter_mut()).enumerate() {
        let normal = normals.get(i).copied().unwrap_or(Vec3::ZERO);
        *tangent = (*tangent - normal * normal.dot(*tangent)).normalize_or_zero();
        *bitangent = bitangent.normalize_or_zero();
    }

    (tangents, bitangents)
}
