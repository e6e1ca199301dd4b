//! Measured isotropic reflectance tables in the MERL `.binary` layout:
//! three little-endian `i32` dimensions (θ_half, θ_diff, φ_diff) followed by
//! `3 * n` little-endian `f64` samples, one channel after another.

use std::f64::consts::{FRAC_PI_2, PI};
use std::path::Path;

use crate::error::{Error, Result};
use crate::geometry::{Fp, Vec3f};

const CHANNEL_SCALE: [Fp; 3] = [1.0 / 1500.0, 1.15 / 1500.0, 1.66 / 1500.0];

#[derive(Clone, Debug)]
pub struct MerlBrdf {
    dims: [usize; 3],
    /// Already scaled to reflectance and clamped to be non-negative.
    samples: Vec<[f32; 3]>,
}

fn read_i32(bytes: &[u8], at: usize) -> Option<i32> {
    bytes.get(at..at + 4)?.try_into().ok().map(i32::from_le_bytes)
}

fn read_f64(bytes: &[u8], at: usize) -> Option<f64> {
    bytes.get(at..at + 8)?.try_into().ok().map(f64::from_le_bytes)
}

fn rotate(v: &Vec3f, axis: &Vec3f, angle: Fp) -> Vec3f {
    let (sin, cos) = angle.sin_cos();
    v * cos + axis * (axis.dot(v) * (1.0 - cos)) + axis.cross(v) * sin
}

impl MerlBrdf {
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        let mut dims = [0usize; 3];
        for (i, dim) in dims.iter_mut().enumerate() {
            let value = read_i32(bytes, 4 * i).ok_or("truncated header")?;
            if value <= 0 {
                return Err(format!("non-positive dimension {value}"));
            }
            *dim = value as usize;
        }
        let n = dims[0]
            .checked_mul(dims[1])
            .and_then(|n| n.checked_mul(dims[2]))
            .ok_or("dimensions too large")?;
        let expected = n
            .checked_mul(3 * 8)
            .and_then(|size| size.checked_add(12))
            .ok_or("dimensions too large")?;
        if bytes.len() != expected {
            return Err(format!(
                "dimensions {}x{}x{} need {expected} bytes, file has {}",
                dims[0],
                dims[1],
                dims[2],
                bytes.len()
            ));
        }
        let mut samples = vec![[0.0f32; 3]; n];
        for (channel, scale) in CHANNEL_SCALE.iter().enumerate() {
            for (i, sample) in samples.iter_mut().enumerate() {
                let raw = read_f64(bytes, 12 + 8 * (channel * n + i)).ok_or("truncated samples")?;
                sample[channel] = (raw * scale).max(0.0) as f32;
            }
        }
        Ok(MerlBrdf { dims, samples })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::asset_load(path, e))?;
        let brdf = Self::from_bytes(&bytes).map_err(|reason| Error::asset_load(path, reason))?;
        let mean = brdf.mean();
        log::info!(
            "loaded measured BRDF {} ({}x{}x{}), mean reflectance [{:.4}, {:.4}, {:.4}]",
            path.display(),
            brdf.dims[0],
            brdf.dims[1],
            brdf.dims[2],
            mean.x,
            mean.y,
            mean.z
        );
        Ok(brdf)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn mean(&self) -> Vec3f {
        let sum = self.samples.iter().fold(Vec3f::zeros(), |acc, s| {
            acc + Vec3f::new(s[0] as Fp, s[1] as Fp, s[2] as Fp)
        });
        sum / self.samples.len().max(1) as Fp
    }

    fn index(&self, theta_half: Fp, theta_diff: Fp, phi_diff: Fp) -> usize {
        let [n_th, n_td, n_pd] = self.dims;
        // θ_half is sampled more densely near the specular peak
        let th = if theta_half <= 0.0 {
            0
        } else {
            ((theta_half / FRAC_PI_2).sqrt() * n_th as Fp) as usize
        }
        .min(n_th - 1);
        let td = ((theta_diff.max(0.0) / FRAC_PI_2) * n_td as Fp) as usize;
        let td = td.min(n_td - 1);
        // reciprocity folds φ_diff into [0, π)
        let phi = if phi_diff < 0.0 { phi_diff + PI } else { phi_diff };
        let pd = ((phi / PI) * n_pd as Fp) as usize;
        let pd = pd.min(n_pd - 1);
        pd + td * n_pd + th * n_pd * n_td
    }

    /// Reflectance for unit directions in the local shading frame (normal
    /// along +z). Zero below the horizon.
    pub fn eval(&self, wi: &Vec3f, wo: &Vec3f) -> Vec3f {
        if wi.z <= 0.0 || wo.z <= 0.0 {
            return Vec3f::zeros();
        }
        let half = match (wi + wo).try_normalize(1e-12) {
            Some(h) => h,
            None => return Vec3f::zeros(),
        };
        let theta_half = half.z.clamp(-1.0, 1.0).acos();
        let phi_half = half.y.atan2(half.x);
        let diff = rotate(&rotate(wi, &Vec3f::z(), -phi_half), &Vec3f::y(), -theta_half);
        let theta_diff = diff.z.clamp(-1.0, 1.0).acos();
        let phi_diff = diff.y.atan2(diff.x);
        let s = self.samples[self.index(theta_half, theta_diff, phi_diff)];
        Vec3f::new(s[0] as Fp, s[1] as Fp, s[2] as Fp)
    }
}

#[cfg(test)]
pub(crate) fn encode(dims: [i32; 3], raw: impl Fn(usize, usize) -> f64) -> Vec<u8> {
    let n = dims.iter().map(|&d| d.max(0) as usize).product::<usize>();
    let mut bytes = Vec::with_capacity(12 + 24 * n);
    for d in dims {
        bytes.extend_from_slice(&d.to_le_bytes());
    }
    for channel in 0..3 {
        for i in 0..n {
            bytes.extend_from_slice(&raw(channel, i).to_le_bytes());
        }
    }
    bytes
}
