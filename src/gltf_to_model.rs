use std::path::Path;

use gltf::buffer::Data;
use gltf::mesh::Mode;
use na::{Matrix3, Matrix4, Matrix4x1};

use crate::error::{Error, Result};
use crate::geometry::{Fp, Object3D, Shape3D, Vec3f};
use crate::mesh::Model;

/// Flattens every triangle mesh reachable from the document's scenes into
/// world space. Cameras, lights and materials in the file are ignored.
pub fn load_gltf<P: AsRef<Path>>(path: P) -> Result<Model> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path).map_err(|e| Error::asset_load(path, e))?;
    let mut objects = Vec::new();
    let identity = Matrix4::<Fp>::identity();
    for scene in document.scenes() {
        for node in scene.nodes() {
            read_primitives(&mut objects, &buffers, &node, &identity);
        }
    }
    if objects.is_empty() {
        return Err(Error::asset_load(path, "no triangles"));
    }
    log::debug!("{}: {} triangles", path.display(), objects.len());
    Ok(Model::new(objects))
}

fn normal_matrix(transformation: &Matrix4<Fp>) -> Matrix3<Fp> {
    let linear = transformation.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
}

fn read_primitives(
    objects: &mut Vec<Object3D>,
    buffers: &[Data],
    node: &gltf::Node,
    transformation: &Matrix4<Fp>,
) {
    let local = node.transform().matrix();
    let local = Matrix4::from_fn(|y, x| local[x][y] as Fp);
    let m_transformation = transformation * local;
    let n_transformation = normal_matrix(&m_transformation);

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                log::warn!(
                    "mesh {:?}: skipping primitive with mode {:?}",
                    mesh.name().unwrap_or("unnamed"),
                    primitive.mode()
                );
                continue;
            }
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let Some(positions) = reader.read_positions().map(|p| p.collect::<Vec<_>>()) else {
                continue;
            };
            let normals = reader.read_normals().map(|n| n.collect::<Vec<_>>());
            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<_>>(),
                None => (0..positions.len() as u32).collect(),
            };
            let to_world = |l: &[f32; 3]| {
                let point =
                    m_transformation * Matrix4x1::new(l[0] as Fp, l[1] as Fp, l[2] as Fp, 1.0);
                Vec3f::new(point[0] / point[3], point[1] / point[3], point[2] / point[3])
            };
            let to_world_normal = |l: &[f32; 3]| {
                let n = n_transformation * Vec3f::new(l[0] as Fp, l[1] as Fp, l[2] as Fp);
                n.try_normalize(1e-12).unwrap_or(n)
            };
            for triangle in indices.chunks_exact(3) {
                let [i, j, k] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
                let (Some(a), Some(b), Some(c)) =
                    (positions.get(i), positions.get(j), positions.get(k))
                else {
                    log::warn!("mesh {:?}: index out of range", mesh.name().unwrap_or("unnamed"));
                    continue;
                };
                let vertex_normals = normals.as_ref().and_then(|n| {
                    Some([
                        to_world_normal(n.get(i)?),
                        to_world_normal(n.get(j)?),
                        to_world_normal(n.get(k)?),
                    ])
                });
                objects.push(Object3D::at_origin(Shape3D::Triangle {
                    a: to_world(a),
                    b: to_world(b),
                    c: to_world(c),
                    normals: vertex_normals,
                }));
            }
        }
    }
    for child in node.children() {
        read_primitives(objects, buffers, &child, &m_transformation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // one triangle (0,0,0) (1,0,0) (0,1,0), no indices, node moved by +2 in z
    const TRIANGLE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [ { "mesh": 0, "translation": [0.0, 0.0, 2.0] } ],
        "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
        "accessors": [ {
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 36 } ],
        "buffers": [ {
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        } ]
    }"#;

    #[test]
    fn node_transform_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triangle.gltf");
        std::fs::write(&path, TRIANGLE).unwrap();
        let model = load_gltf(&path).unwrap();
        assert_eq!(model.len(), 1);
        match &model.objects[0].shape {
            Shape3D::Triangle { a, b, c, normals } => {
                assert_relative_eq!(*a, Vec3f::new(0.0, 0.0, 2.0), epsilon = 1e-6);
                assert_relative_eq!(*b, Vec3f::new(1.0, 0.0, 2.0), epsilon = 1e-6);
                assert_relative_eq!(*c, Vec3f::new(0.0, 1.0, 2.0), epsilon = 1e-6);
                assert!(normals.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn normals_use_inverse_transpose() {
        let scale = Matrix4::new_nonuniform_scaling(&Vec3f::new(2.0, 1.0, 1.0));
        let n = normal_matrix(&scale) * Vec3f::new(1.0, 1.0, 0.0);
        assert_relative_eq!(n, Vec3f::new(0.5, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn broken_file_is_an_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gltf");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(load_gltf(&path), Err(Error::AssetLoad { .. })));
    }
}
