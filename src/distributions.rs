use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::geometry::Fp;

/// Samples sub-pixel offsets (relative to the pixel center, in pixels).
pub trait SampleDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (Fp, Fp);
}

pub struct BoxDistribution;

pub struct GaussianDistribution {
    pub stddev: Fp,
    pub radius: Fp,
}

impl SampleDistribution for BoxDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (Fp, Fp) {
        (rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5))
    }
}

impl SampleDistribution for GaussianDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (Fp, Fp) {
        let mut draw = || {
            let z: Fp = rng.sample(StandardNormal);
            (z * self.stddev).clamp(-self.radius, self.radius)
        };
        let dx = draw();
        let dy = draw();
        (dx, dy)
    }
}

/// Pixel reconstruction filter used by the tracer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PixelFilter {
    Box,
    Gaussian { stddev: Fp },
}

impl Default for PixelFilter {
    fn default() -> Self {
        PixelFilter::Gaussian { stddev: 0.5 }
    }
}

impl PixelFilter {
    pub fn offset<R: Rng + ?Sized>(&self, rng: &mut R) -> (Fp, Fp) {
        match *self {
            PixelFilter::Box => BoxDistribution.sample(rng),
            PixelFilter::Gaussian { stddev } if stddev > 0.0 => GaussianDistribution {
                stddev,
                radius: 4.0 * stddev,
            }
            .sample(rng),
            PixelFilter::Gaussian { .. } => (0.0, 0.0),
        }
    }
}
