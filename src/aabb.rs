use crate::geometry::{Fp, Object3D, Ray, Shape3D, Vec3f, EPS, FP_INF, FP_NEG_INF};

#[derive(Clone, Debug)]
pub struct Aabb {
    pub min: Vec3f,
    pub max: Vec3f,
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb {
            min: Vec3f::new(FP_INF, FP_INF, FP_INF),
            max: Vec3f::new(FP_NEG_INF, FP_NEG_INF, FP_NEG_INF),
        }
    }
}

impl Aabb {
    pub fn extend_point(&self, point: &Vec3f) -> Aabb {
        Aabb {
            min: self.min.inf(point),
            max: self.max.sup(point),
        }
    }

    pub fn extend_aabb(&self, aabb: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&aabb.min),
            max: self.max.sup(&aabb.max),
        }
    }

    pub fn center(&self) -> Vec3f {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, aabb: &Aabb) -> bool {
        (0..3).all(|axis| aabb.min[axis] >= self.min[axis] && aabb.max[axis] <= self.max[axis])
    }

    /// Slab test. Returns the entry offset if the ray overlaps the box
    /// somewhere in `[0, upper_bound)`.
    pub fn hit(&self, ray: &Ray, upper_bound: Fp) -> Option<Fp> {
        let mut t_enter: Fp = 0.0;
        let mut t_exit = upper_bound;
        for axis in 0..3 {
            let inv = 1.0 / ray.direction[axis];
            let mut t0 = (self.min[axis] - ray.origin[axis]) * inv;
            let mut t1 = (self.max[axis] - ray.origin[axis]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // NaN (origin on a slab plane with a parallel ray) keeps the old bound
            t_enter = if t0 > t_enter { t0 } else { t_enter };
            t_exit = if t1 < t_exit { t1 } else { t_exit };
            if t_exit < t_enter {
                return None;
            }
        }
        Some(t_enter)
    }
}

fn calculate_aabb_for_shape(shape3d: &Shape3D) -> Aabb {
    let eps_vec = Vec3f::new(EPS, EPS, EPS);
    match shape3d {
        Shape3D::Ellipsoid { r } => Aabb {
            min: -r - eps_vec,
            max: r + eps_vec,
        },
        Shape3D::Box { s } => Aabb {
            min: -s - eps_vec,
            max: s + eps_vec,
        },
        Shape3D::Triangle { a, b, c, .. } => Aabb {
            min: a.inf(b).inf(c) - eps_vec,
            max: a.sup(b).sup(c) + eps_vec,
        },
    }
}

// to make the formatter happy
fn if_then_else<T>(cond: bool, fst: T, snd: T) -> T {
    if cond {
        fst
    } else {
        snd
    }
}

pub fn calculate_aabb_for_object(object: &Object3D) -> Aabb {
    let mut result = Aabb::default();
    let shape_aabb = calculate_aabb_for_shape(&object.shape);
    for x_from_min in [false, true] {
        for y_from_min in [false, true] {
            for z_from_min in [false, true] {
                let point = Vec3f::new(
                    if_then_else(x_from_min, shape_aabb.min.x, shape_aabb.max.x),
                    if_then_else(y_from_min, shape_aabb.min.y, shape_aabb.max.y),
                    if_then_else(z_from_min, shape_aabb.min.z, shape_aabb.max.z),
                );
                let object_point = object.rotation.transform_vector(&point) + object.position;
                result = result.extend_point(&object_point);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::UnitQuaternion;

    #[test]
    fn rotated_box_bounds_contain_the_box() {
        let object = Object3D {
            shape: Shape3D::Box {
                s: Vec3f::new(1.0, 0.5, 0.25),
            },
            position: Vec3f::new(2.0, 0.0, 0.0),
            rotation: UnitQuaternion::from_euler_angles(0.3, 0.7, 1.1),
        };
        let aabb = calculate_aabb_for_object(&object);
        assert!(aabb.min.x < 2.0 && aabb.max.x > 2.0);
        let unrotated = calculate_aabb_for_object(&Object3D {
            rotation: UnitQuaternion::identity(),
            ..object.clone()
        });
        assert!((aabb.max - aabb.min).norm() >= (unrotated.max - unrotated.min).norm() - EPS);
    }

    #[test]
    fn slab_test_respects_upper_bound() {
        let aabb = Aabb {
            min: Vec3f::new(-1.0, -1.0, -1.0),
            max: Vec3f::new(1.0, 1.0, 1.0),
        };
        let ray = Ray {
            origin: Vec3f::new(0.0, 0.0, 5.0),
            direction: -Vec3f::z(),
        };
        assert_eq!(aabb.hit(&ray, FP_INF), Some(4.0));
        assert_eq!(aabb.hit(&ray, 3.0), None);
        let inside = Ray {
            origin: Vec3f::zeros(),
            direction: Vec3f::x(),
        };
        assert_eq!(aabb.hit(&inside, FP_INF), Some(0.0));
    }
}
