use std::path::Path;

use crate::aabb::{calculate_aabb_for_object, Aabb};
use crate::error::{Error, Result};
use crate::geometry::{Object3D, Shape3D, Vec3f};
use crate::gltf_to_model::load_gltf;

/// Renderable geometry of one dataset object, in world space.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub objects: Vec<Object3D>,
}

pub const BUILTIN_OBJECTS: [&str; 5] = ["sphere", "cube", "plane", "cylinder", "torus"];

const SEGMENTS: usize = 32;

fn triangle(a: Vec3f, b: Vec3f, c: Vec3f, normals: Option<[Vec3f; 3]>) -> Object3D {
    Object3D::at_origin(Shape3D::Triangle { a, b, c, normals })
}

/// Splits the quad `a b c d` (in order around its edge) into two triangles.
fn quad(points: [Vec3f; 4], normals: [Vec3f; 4]) -> [Object3D; 2] {
    let [a, b, c, d] = points;
    let [na, nb, nc, nd] = normals;
    [
        triangle(a, b, d, Some([na, nb, nd])),
        triangle(b, c, d, Some([nb, nc, nd])),
    ]
}

impl Model {
    pub fn new(objects: Vec<Object3D>) -> Self {
        Model { objects }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.objects
            .iter()
            .fold(Aabb::default(), |acc, object| {
                acc.extend_aabb(&calculate_aabb_for_object(object))
            })
    }

    pub fn sphere(radius: f64) -> Self {
        Model::new(vec![Object3D::at_origin(Shape3D::Ellipsoid {
            r: Vec3f::repeat(radius),
        })])
    }

    pub fn cube(edge: f64) -> Self {
        Model::new(vec![Object3D::at_origin(Shape3D::Box {
            s: Vec3f::repeat(edge * 0.5),
        })])
    }

    /// Two triangles spanning `size` x `size` in the z = 0 plane, facing +z.
    pub fn plane(size: f64) -> Self {
        let h = size * 0.5;
        let corners = [
            Vec3f::new(-h, -h, 0.0),
            Vec3f::new(h, -h, 0.0),
            Vec3f::new(h, h, 0.0),
            Vec3f::new(-h, h, 0.0),
        ];
        let triangle = |a: usize, b: usize, c: usize| {
            Object3D::at_origin(Shape3D::Triangle {
                a: corners[a],
                b: corners[b],
                c: corners[c],
                normals: None,
            })
        };
        Model::new(vec![triangle(0, 1, 2), triangle(0, 2, 3)])
    }

    /// Capped cylinder around the y axis, centred on the origin. Sides are
    /// smooth shaded, caps are flat.
    pub fn cylinder(radius: f64, height: f64) -> Self {
        let h = height * 0.5;
        let rim = |i: usize| {
            let angle = 2.0 * std::f64::consts::PI * (i % SEGMENTS) as f64 / SEGMENTS as f64;
            Vec3f::new(angle.cos(), 0.0, angle.sin())
        };
        let mut objects = Vec::with_capacity(4 * SEGMENTS);
        for i in 0..SEGMENTS {
            let (n0, n1) = (rim(i), rim(i + 1));
            let at = |n: Vec3f, y: f64| n * radius + Vec3f::new(0.0, y, 0.0);
            objects.extend(quad(
                [at(n0, -h), at(n1, -h), at(n1, h), at(n0, h)],
                [n0, n1, n1, n0],
            ));
            for y in [-h, h] {
                objects.push(triangle(Vec3f::new(0.0, y, 0.0), at(n0, y), at(n1, y), None));
            }
        }
        Model::new(objects)
    }

    /// Torus around the y axis: `major` is the distance from the centre to
    /// the middle of the tube, `minor` the tube radius.
    pub fn torus(major: f64, minor: f64) -> Self {
        let tube_segments = SEGMENTS / 2;
        let point = |i: usize, j: usize| {
            let theta = 2.0 * std::f64::consts::PI * (i % SEGMENTS) as f64 / SEGMENTS as f64;
            let phi =
                2.0 * std::f64::consts::PI * (j % tube_segments) as f64 / tube_segments as f64;
            let normal = Vec3f::new(phi.cos() * theta.cos(), phi.sin(), phi.cos() * theta.sin());
            let center = Vec3f::new(theta.cos(), 0.0, theta.sin()) * major;
            (center + normal * minor, normal)
        };
        let mut objects = Vec::with_capacity(2 * SEGMENTS * tube_segments);
        for i in 0..SEGMENTS {
            for j in 0..tube_segments {
                let corners = [point(i, j), point(i, j + 1), point(i + 1, j + 1), point(i + 1, j)];
                objects.extend(quad(corners.map(|(p, _)| p), corners.map(|(_, n)| n)));
            }
        }
        Model::new(objects)
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "sphere" => Some(Model::sphere(1.0)),
            "cube" => Some(Model::cube(1.0)),
            "plane" => Some(Model::plane(2.0)),
            "cylinder" => Some(Model::cylinder(1.0, 2.0)),
            "torus" => Some(Model::torus(1.0, 0.3)),
            _ => None,
        }
    }
}

/// Reads every triangle of a Wavefront OBJ. Vertex normals are used for
/// shading when the file has them.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Model> {
    let path = path.as_ref();
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };
    let (models, _materials) =
        tobj::load_obj(path, &options).map_err(|e| Error::asset_load(path, e))?;
    let mut objects = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let vertex = |i: u32| {
            let i = 3 * i as usize;
            Vec3f::new(
                mesh.positions[i] as f64,
                mesh.positions[i + 1] as f64,
                mesh.positions[i + 2] as f64,
            )
        };
        let normal = |i: u32| {
            let i = 3 * i as usize;
            Vec3f::new(
                mesh.normals[i] as f64,
                mesh.normals[i + 1] as f64,
                mesh.normals[i + 2] as f64,
            )
        };
        let has_normals = mesh.normals.len() == mesh.positions.len();
        for triangle in mesh.indices.chunks_exact(3) {
            let normals = has_normals
                .then(|| [normal(triangle[0]), normal(triangle[1]), normal(triangle[2])]);
            objects.push(Object3D::at_origin(Shape3D::Triangle {
                a: vertex(triangle[0]),
                b: vertex(triangle[1]),
                c: vertex(triangle[2]),
                normals,
            }));
        }
    }
    if objects.is_empty() {
        return Err(Error::asset_load(path, "no triangles"));
    }
    log::debug!("{}: {} triangles from {} shapes", path.display(), objects.len(), models.len());
    Ok(Model::new(objects))
}

/// Picks a loader by file extension.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => load_obj(path),
        Some("gltf") | Some("glb") => load_gltf(path),
        _ => Err(Error::asset_load(path, "unsupported mesh format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const QUAD: &str = "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\n";

    #[test]
    fn builtins_have_expected_extent() {
        let sphere = Model::builtin("sphere").unwrap().bounds();
        assert_relative_eq!(sphere.max, Vec3f::repeat(1.0), epsilon = 1e-4);
        let cube = Model::builtin("cube").unwrap().bounds();
        assert_relative_eq!(cube.max, Vec3f::repeat(0.5), epsilon = 1e-4);
        let plane = Model::builtin("plane").unwrap();
        assert_eq!(plane.len(), 2);
        assert_relative_eq!(plane.bounds().min, Vec3f::new(-1.0, -1.0, 0.0), epsilon = 1e-4);
        assert!(Model::builtin("teapot").is_none());
    }

    #[test]
    fn procedural_builtins_are_closed_meshes() {
        let cylinder = Model::builtin("cylinder").unwrap();
        assert_eq!(cylinder.len(), 4 * 32);
        assert_relative_eq!(cylinder.bounds().min, Vec3f::new(-1.0, -1.0, -1.0), epsilon = 1e-4);
        assert_relative_eq!(cylinder.bounds().max, Vec3f::new(1.0, 1.0, 1.0), epsilon = 1e-4);

        let torus = Model::builtin("torus").unwrap();
        assert_eq!(torus.len(), 2 * 32 * 16);
        assert_relative_eq!(torus.bounds().max, Vec3f::new(1.3, 0.3, 1.3), epsilon = 1e-4);
        for object in &torus.objects {
            let Shape3D::Triangle { a, normals: Some(n), .. } = &object.shape else {
                panic!("torus should be smooth triangles");
            };
            // tube surface: distance to the ring centre line is the minor radius
            let ring = Vec3f::new(a.x, 0.0, a.z).normalize();
            assert_relative_eq!((a - ring).norm(), 0.3, epsilon = 1e-9);
            assert_relative_eq!(n[0].norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn obj_quads_are_triangulated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        std::fs::write(&path, QUAD).unwrap();
        let model = load_model(&path).unwrap();
        assert_eq!(model.len(), 2);
        for object in &model.objects {
            match &object.shape {
                Shape3D::Triangle { normals: Some(n), .. } => {
                    assert!(n.iter().all(|n| *n == Vec3f::z()))
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_extension_and_missing_file_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_model(dir.path().join("mesh.ply")),
            Err(Error::AssetLoad { .. })
        ));
        assert!(matches!(
            load_model(dir.path().join("missing.obj")),
            Err(Error::AssetLoad { .. })
        ));
    }
}
