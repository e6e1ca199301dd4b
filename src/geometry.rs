use arrayvec::ArrayVec;
use nalgebra::{UnitQuaternion, Vector3};

pub type Fp = f64;
pub type Vec3f = Vector3<Fp>;

pub static EPS: Fp = 0.00001;
pub const FP_INF: Fp = Fp::INFINITY;
pub const FP_NEG_INF: Fp = Fp::NEG_INFINITY;

#[derive(Clone, Debug)]
pub struct Ray {
    pub origin: Vec3f,
    pub direction: Vec3f,
}

impl Ray {
    pub fn at(&self, offset: Fp) -> Vec3f {
        self.origin + self.direction * offset
    }
}

/// A ray hit. `normal` is the outward shading normal in world space; callers
/// flip it toward the viewer when they need a facing normal.
#[derive(Clone, Debug)]
pub struct Intersection {
    pub offset: Fp,
    pub normal: Vec3f,
}

#[derive(Clone, Debug)]
pub enum Shape3D {
    Ellipsoid {
        r: Vec3f,
    },
    Box {
        s: Vec3f,
    },
    Triangle {
        a: Vec3f,
        b: Vec3f,
        c: Vec3f,
        normals: Option<[Vec3f; 3]>,
    },
}

#[derive(Clone, Debug)]
pub struct Object3D {
    pub shape: Shape3D,
    pub position: Vec3f,
    pub rotation: UnitQuaternion<Fp>,
}

impl Object3D {
    pub fn at_origin(shape: Shape3D) -> Object3D {
        Object3D {
            shape,
            position: Vec3f::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

fn box_face_normal(p: &Vec3f, s: &Vec3f) -> Vec3f {
    if (p.x / s.x).abs() > 1.0 - EPS {
        Vec3f::new((p.x / s.x).signum(), 0.0, 0.0)
    } else if (p.y / s.y).abs() > 1.0 - EPS {
        Vec3f::new(0.0, (p.y / s.y).signum(), 0.0)
    } else {
        Vec3f::new(0.0, 0.0, (p.z / s.z).signum())
    }
}

fn intersect_triangle(
    ray: &Ray,
    a: &Vec3f,
    b: &Vec3f,
    c: &Vec3f,
    normals: &Option<[Vec3f; 3]>,
    upper_bound: Fp,
) -> Option<Intersection> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let t_vec = ray.origin - a;
    let u = t_vec.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = t_vec.cross(&e1);
    let v = ray.direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let offset = e2.dot(&q) * inv_det;
    if !(0.0 < offset && offset < upper_bound) {
        return None;
    }
    let geometric = e1.cross(&e2).normalize();
    let normal = match normals {
        Some([n_a, n_b, n_c]) => (n_a * (1.0 - u - v) + n_b * u + n_c * v)
            .try_normalize(EPS)
            .unwrap_or(geometric),
        None => geometric,
    };
    Some(Intersection { offset, normal })
}

// intersections are returned ordered by offset, each in (0, upper_bound)
fn intersect_all_points(ray: &Ray, shape: &Shape3D, upper_bound: Fp) -> ArrayVec<Intersection, 2> {
    match shape {
        Shape3D::Ellipsoid { r } => {
            let d1 = ray.direction.component_div(r);
            let o1 = ray.origin.component_div(r);
            let a = d1.dot(&d1);
            let b = 2.0 * o1.dot(&d1);
            let c = o1.dot(&o1) - 1.0;
            let discr = b * b - 4.0 * a * c;
            let mut result = ArrayVec::<Intersection, 2>::new();
            if discr < 0.0 {
                return result;
            }
            let x1 = (-b - discr.sqrt()) / (2.0 * a);
            let x2 = (-b + discr.sqrt()) / (2.0 * a);
            for t in [Fp::min(x1, x2), Fp::max(x1, x2)] {
                if t > 0.0 && t < upper_bound {
                    let p = ray.at(t);
                    result.push(Intersection {
                        offset: t,
                        normal: p.component_div(r).component_div(r).normalize(),
                    });
                }
            }
            result
        }
        Shape3D::Box { s } => {
            let mut t_x = [
                (-s.x - ray.origin.x) / (ray.direction.x + 0.001 * EPS),
                (s.x - ray.origin.x) / (ray.direction.x + 0.001 * EPS),
            ];
            t_x.sort_by(|a, b| a.total_cmp(b));

            let mut t_y = [
                (-s.y - ray.origin.y) / (ray.direction.y + 0.001 * EPS),
                (s.y - ray.origin.y) / (ray.direction.y + 0.001 * EPS),
            ];
            t_y.sort_by(|a, b| a.total_cmp(b));

            let mut t_z = [
                (-s.z - ray.origin.z) / (ray.direction.z + 0.001 * EPS),
                (s.z - ray.origin.z) / (ray.direction.z + 0.001 * EPS),
            ];
            t_z.sort_by(|a, b| a.total_cmp(b));

            let t_min = Fp::max(t_x[0], Fp::max(t_y[0], t_z[0]));
            let t_max = Fp::min(t_x[1], Fp::min(t_y[1], t_z[1]));
            let mut result = ArrayVec::<Intersection, 2>::new();
            if t_min < t_max {
                for t in [t_min, t_max] {
                    if t > 0.0 && t < upper_bound {
                        result.push(Intersection {
                            offset: t,
                            normal: box_face_normal(&ray.at(t), s),
                        });
                    }
                }
            }
            result
        }
        Shape3D::Triangle { a, b, c, normals } => {
            let mut result = ArrayVec::<Intersection, 2>::new();
            if let Some(hit) = intersect_triangle(ray, a, b, c, normals, upper_bound) {
                result.push(hit);
            }
            result
        }
    }
}

/// Nearest hit of `ray` with `object` whose offset lies in `(0, upper_bound)`.
pub fn intersect_ray_with_object3d(
    ray: &Ray,
    object: &Object3D,
    upper_bound: Fp,
) -> Option<Intersection> {
    let transposed_ray = Ray {
        origin: ray.origin - object.position,
        direction: ray.direction,
    };
    let rotated_ray = Ray {
        origin: object
            .rotation
            .conjugate()
            .transform_vector(&transposed_ray.origin),
        direction: object
            .rotation
            .conjugate()
            .transform_vector(&transposed_ray.direction),
    };
    let mut intersections = intersect_all_points(&rotated_ray, &object.shape, upper_bound);
    if intersections.is_empty() {
        return None;
    }
    let mut intersection = intersections.remove(0);
    intersection.normal = object.rotation.transform_vector(&intersection.normal);
    Some(intersection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ray(origin: Vec3f, direction: Vec3f) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    #[test]
    fn unit_sphere_is_hit_at_its_surface() {
        let sphere = Object3D::at_origin(Shape3D::Ellipsoid {
            r: Vec3f::new(1.0, 1.0, 1.0),
        });
        let hit = intersect_ray_with_object3d(
            &ray(Vec3f::new(0.0, 0.0, 5.0), -Vec3f::z()),
            &sphere,
            FP_INF,
        )
        .unwrap();
        assert_relative_eq!(hit.offset, 4.0, epsilon = 1e-9);
        assert_relative_eq!(hit.normal, Vec3f::z(), epsilon = 1e-9);
    }

    #[test]
    fn upper_bound_hides_far_hits() {
        let sphere = Object3D::at_origin(Shape3D::Ellipsoid {
            r: Vec3f::new(1.0, 1.0, 1.0),
        });
        let hit = intersect_ray_with_object3d(
            &ray(Vec3f::new(0.0, 0.0, 5.0), -Vec3f::z()),
            &sphere,
            3.5,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn triangle_interpolates_vertex_normals() {
        let n = Vec3f::new(0.0, 0.0, 1.0);
        let tilted = Vec3f::new(1.0, 0.0, 1.0).normalize();
        let triangle = Object3D::at_origin(Shape3D::Triangle {
            a: Vec3f::new(-1.0, -1.0, 0.0),
            b: Vec3f::new(1.0, -1.0, 0.0),
            c: Vec3f::new(0.0, 1.0, 0.0),
            normals: Some([n, tilted, n]),
        });
        let hit = intersect_ray_with_object3d(
            &ray(Vec3f::new(0.0, -0.5, 2.0), -Vec3f::z()),
            &triangle,
            FP_INF,
        )
        .unwrap();
        assert_relative_eq!(hit.offset, 2.0, epsilon = 1e-9);
        assert!(hit.normal.x > 0.0);
        assert_relative_eq!(hit.normal.norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn triangle_miss_outside_edges() {
        let triangle = Object3D::at_origin(Shape3D::Triangle {
            a: Vec3f::new(-1.0, -1.0, 0.0),
            b: Vec3f::new(1.0, -1.0, 0.0),
            c: Vec3f::new(0.0, 1.0, 0.0),
            normals: None,
        });
        let hit = intersect_ray_with_object3d(
            &ray(Vec3f::new(2.0, 2.0, 2.0), -Vec3f::z()),
            &triangle,
            FP_INF,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn box_reports_face_normal() {
        let cube = Object3D::at_origin(Shape3D::Box {
            s: Vec3f::new(0.5, 0.5, 0.5),
        });
        let hit = intersect_ray_with_object3d(
            &ray(Vec3f::new(3.0, 0.1, 0.2), -Vec3f::x()),
            &cube,
            FP_INF,
        )
        .unwrap();
        assert_relative_eq!(hit.offset, 2.5, epsilon = 1e-6);
        assert_relative_eq!(hit.normal, Vec3f::x(), epsilon = 1e-9);
    }
}
