//! Deterministic placement of lights and light-field cameras.
//!
//! Everything here is a pure function of its arguments: the same parameters
//! always give the same sequence, which is what makes a dataset regenerable.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Fp, Vec3f};
use crate::utils::safe_sqrt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LightPattern {
    Hemisphere,
    Circle,
    Grid,
}

impl LightPattern {
    pub fn name(&self) -> &'static str {
        match self {
            LightPattern::Hemisphere => "hemisphere",
            LightPattern::Circle => "circle",
            LightPattern::Grid => "grid",
        }
    }
}

impl fmt::Display for LightPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LightPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hemisphere" => Ok(LightPattern::Hemisphere),
            "circle" => Ok(LightPattern::Circle),
            "grid" => Ok(LightPattern::Grid),
            _ => Err(Error::UnsupportedPattern(s.to_string())),
        }
    }
}

impl TryFrom<String> for LightPattern {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LightPattern> for String {
    fn from(pattern: LightPattern) -> Self {
        pattern.name().to_string()
    }
}

/// Angular limits for light placement, in degrees. Elevation is measured
/// from the horizontal (xy) plane toward +z, the camera side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementBounds {
    pub min_elevation_deg: Fp,
    pub max_elevation_deg: Fp,
    /// Fixed elevation of the `circle` pattern.
    pub circle_elevation_deg: Fp,
    pub azimuth_offset_deg: Fp,
}

impl Default for PlacementBounds {
    fn default() -> Self {
        PlacementBounds {
            min_elevation_deg: 0.0,
            max_elevation_deg: 90.0,
            circle_elevation_deg: 45.0,
            azimuth_offset_deg: 0.0,
        }
    }
}

impl PlacementBounds {
    pub fn validate(&self) -> Result<()> {
        let in_range = |deg: Fp| deg.is_finite() && (0.0..=90.0).contains(&deg);
        if !in_range(self.min_elevation_deg) || !in_range(self.max_elevation_deg) {
            return Err(Error::invalid(format!(
                "elevation bounds must lie in [0, 90] degrees, got [{}, {}]",
                self.min_elevation_deg, self.max_elevation_deg
            )));
        }
        if self.min_elevation_deg > self.max_elevation_deg {
            return Err(Error::invalid(format!(
                "minimum elevation {} exceeds maximum elevation {}",
                self.min_elevation_deg, self.max_elevation_deg
            )));
        }
        if !in_range(self.circle_elevation_deg) {
            return Err(Error::invalid(format!(
                "circle elevation must lie in [0, 90] degrees, got {}",
                self.circle_elevation_deg
            )));
        }
        if !self.azimuth_offset_deg.is_finite() {
            return Err(Error::invalid("azimuth offset must be finite"));
        }
        Ok(())
    }
}

pub fn place_lights(pattern: LightPattern, count: usize, radius: Fp) -> Result<Vec<Vec3f>> {
    place_lights_within(pattern, count, radius, &PlacementBounds::default())
}

pub fn place_lights_within(
    pattern: LightPattern,
    count: usize,
    radius: Fp,
    bounds: &PlacementBounds,
) -> Result<Vec<Vec3f>> {
    if count == 0 {
        return Err(Error::invalid("light count must be at least 1"));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(Error::invalid(format!("light radius must be positive, got {radius}")));
    }
    bounds.validate()?;
    let azimuth_offset = bounds.azimuth_offset_deg.to_radians();
    let positions = match pattern {
        LightPattern::Hemisphere => {
            let z_high = bounds.max_elevation_deg.to_radians().sin();
            let z_low = bounds.min_elevation_deg.to_radians().sin();
            let golden_angle = PI * (1.0 + 5.0_f64.sqrt());
            (0..count)
                .map(|i| {
                    let z = z_high - (i as Fp + 0.5) / count as Fp * (z_high - z_low);
                    let ring = safe_sqrt(1.0 - z * z);
                    let phi = golden_angle * i as Fp + azimuth_offset;
                    Vec3f::new(ring * phi.cos(), ring * phi.sin(), z) * radius
                })
                .collect()
        }
        LightPattern::Circle => {
            let elevation = bounds.circle_elevation_deg.to_radians();
            let (z, ring) = (elevation.sin(), elevation.cos());
            (0..count)
                .map(|i| {
                    let phi = 2.0 * PI * i as Fp / count as Fp + azimuth_offset;
                    Vec3f::new(ring * phi.cos(), ring * phi.sin(), z) * radius
                })
                .collect()
        }
        LightPattern::Grid => {
            let grid_size = (count as Fp).sqrt().ceil() as usize;
            let g = grid_size as Fp;
            (0..count)
                .map(|i| {
                    let row = (i / grid_size) as Fp;
                    let col = (i % grid_size) as Fp;
                    let x = (col - g / 2.0 + 0.5) / g;
                    let y = (row - g / 2.0 + 0.5) / g;
                    Vec3f::new(x, y, 1.0).normalize() * radius
                })
                .collect()
        }
    };
    log::debug!("placed {count} lights in a {pattern} pattern at radius {radius}");
    Ok(positions)
}

/// Camera positions of a `grid_size`² light-field array, row-major, centred
/// on `(center_x, center_y)` at height `distance`.
pub fn generate_lightfield_positions(
    grid_size: usize,
    spacing_x: Fp,
    spacing_y: Fp,
    center_x: Fp,
    center_y: Fp,
    distance: Fp,
) -> Result<Vec<Vec3f>> {
    if grid_size == 0 {
        return Err(Error::invalid("light-field grid size must be at least 1"));
    }
    let all_finite = [spacing_x, spacing_y, center_x, center_y, distance]
        .iter()
        .all(|v| v.is_finite());
    if !all_finite {
        return Err(Error::invalid("light-field parameters must be finite"));
    }
    if grid_size > 1 && (spacing_x <= 0.0 || spacing_y <= 0.0) {
        return Err(Error::invalid(format!(
            "light-field spacing must be positive, got ({spacing_x}, {spacing_y})"
        )));
    }
    let half = (grid_size as Fp - 1.0) / 2.0;
    let mut positions = Vec::with_capacity(grid_size * grid_size);
    for i in 0..grid_size {
        for j in 0..grid_size {
            positions.push(Vec3f::new(
                center_x + (j as Fp - half) * spacing_x,
                center_y + (i as Fp - half) * spacing_y,
                distance,
            ));
        }
    }
    Ok(positions)
}
