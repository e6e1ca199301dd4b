use crate::geometry::{Fp, Vec3f};

pub fn safe_sqrt(x: Fp) -> Fp {
    Fp::max(0.0, x).sqrt()
}

/// Tangent and bitangent completing `normal` to a right-handed frame
/// (Duff et al., "Building an Orthonormal Basis, Revisited").
pub fn orthonormal_basis(normal: &Vec3f) -> (Vec3f, Vec3f) {
    let sign = 1.0_f64.copysign(normal.z);
    let a = -1.0 / (sign + normal.z);
    let b = normal.x * normal.y * a;
    let tangent = Vec3f::new(1.0 + sign * normal.x * normal.x * a, sign * b, -sign * normal.x);
    let bitangent = Vec3f::new(b, sign + normal.y * normal.y * a, -normal.y);
    (tangent, bitangent)
}

/// SplitMix64 finaliser, used to derive independent per-pixel seeds.
pub fn mix_seed(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn basis_is_orthonormal() {
        for normal in [
            Vec3f::z(),
            -Vec3f::z(),
            Vec3f::new(0.3, -0.4, 0.5).normalize(),
            Vec3f::new(-1.0, 2.0, -0.1).normalize(),
        ] {
            let (t, b) = orthonormal_basis(&normal);
            assert_relative_eq!(t.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(b.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(t.dot(&normal), 0.0, epsilon = 1e-12);
            assert_relative_eq!(b.dot(&normal), 0.0, epsilon = 1e-12);
            assert_relative_eq!(t.dot(&b), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn safe_sqrt_clamps_negative_rounding() {
        assert_eq!(safe_sqrt(-1e-17), 0.0);
    }
}
