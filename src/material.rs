use std::f64::consts::FRAC_1_PI;

use crate::geometry::Vec3f;
use crate::merl::MerlBrdf;
use crate::utils::orthonormal_basis;

#[derive(Clone, Debug)]
pub enum Reflectance {
    /// Lambertian with the given albedo.
    Diffuse { albedo: Vec3f },
    Measured(MerlBrdf),
}

impl Reflectance {
    pub fn diffuse(albedo: Vec3f) -> Self {
        Reflectance::Diffuse { albedo }
    }

    /// BRDF value for world-space unit vectors. `wi` points to the light and
    /// `wo` to the viewer; both are expected on the side of `normal`.
    pub fn eval(&self, normal: &Vec3f, wi: &Vec3f, wo: &Vec3f) -> Vec3f {
        match self {
            Reflectance::Diffuse { albedo } => {
                if normal.dot(wi) <= 0.0 || normal.dot(wo) <= 0.0 {
                    Vec3f::zeros()
                } else {
                    albedo * FRAC_1_PI
                }
            }
            Reflectance::Measured(brdf) => {
                let (t, b) = orthonormal_basis(normal);
                let local = |v: &Vec3f| Vec3f::new(v.dot(&t), v.dot(&b), v.dot(normal));
                brdf.eval(&local(wi), &local(wo))
            }
        }
    }
}

impl From<MerlBrdf> for Reflectance {
    fn from(brdf: MerlBrdf) -> Self {
        Reflectance::Measured(brdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merl::encode;
    use approx::assert_relative_eq;

    #[test]
    fn diffuse_is_albedo_over_pi() {
        let material = Reflectance::diffuse(Vec3f::new(0.5, 0.25, 1.0));
        let n = Vec3f::y();
        let wi = Vec3f::new(0.0, 1.0, 1.0).normalize();
        let f = material.eval(&n, &wi, &n);
        assert_relative_eq!(f, Vec3f::new(0.5, 0.25, 1.0) / std::f64::consts::PI, epsilon = 1e-12);
        assert_eq!(material.eval(&n, &-wi, &n), Vec3f::zeros());
    }

    #[test]
    fn measured_table_is_evaluated_in_local_frame() {
        let bytes = encode([2, 2, 4], |channel, _| if channel == 0 { 750.0 } else { 0.0 });
        let material: Reflectance = MerlBrdf::from_bytes(&bytes).unwrap().into();
        // a tilted normal still sees both directions above its horizon
        let n = Vec3f::new(1.0, 0.0, 0.0);
        let wi = Vec3f::new(0.8, 0.6, 0.0);
        let wo = Vec3f::new(0.8, 0.0, 0.6);
        assert_relative_eq!(material.eval(&n, &wi, &wo).x, 0.5, epsilon = 1e-6);
        assert_eq!(material.eval(&n, &-wi, &wo), Vec3f::zeros());
    }
}
