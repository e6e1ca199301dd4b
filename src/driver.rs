use std::fmt;
use std::path::Path;

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::renderer::{ExecutionContext, FloatImage, RenderError, Renderer};
use crate::scene::{SceneSpec, ShadingMode};

/// What an image is for. `camera` is set only in light-field datasets;
/// light indices start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRole {
    Light { camera: Option<usize>, index: usize },
    GroundTruthNormal { camera: Option<usize> },
}

impl ImageRole {
    pub fn file_name(&self) -> String {
        match *self {
            ImageRole::Light { camera: None, index } => format!("light_{index}.png"),
            ImageRole::Light {
                camera: Some(camera),
                index,
            } => format!("cam_{camera:02}_light_{index}.png"),
            ImageRole::GroundTruthNormal { camera: None } => "ground_truth_normal.png".to_string(),
            ImageRole::GroundTruthNormal { camera: Some(camera) } => {
                format!("cam_{camera:02}_ground_truth_normal.png")
            }
        }
    }

    pub fn shading(&self) -> ShadingMode {
        match self {
            ImageRole::Light { .. } => ShadingMode::Material,
            ImageRole::GroundTruthNormal { .. } => ShadingMode::NormalVisualization,
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Light { camera: Some(c), index } => write!(f, "camera {c} light {index}"),
            ImageRole::Light { camera: None, index } => write!(f, "light {index}"),
            ImageRole::GroundTruthNormal { camera: Some(c) } => write!(f, "camera {c} normal map"),
            ImageRole::GroundTruthNormal { camera: None } => write!(f, "normal map"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gamma {
    Srgb,
    Linear,
    Power(f32),
}

impl Gamma {
    fn encode(&self, v: f32) -> f32 {
        match *self {
            Gamma::Srgb if v <= 0.003_130_8 => 12.92 * v,
            Gamma::Srgb => 1.055 * v.powf(1.0 / 2.4) - 0.055,
            Gamma::Linear => v,
            Gamma::Power(g) => v.powf(1.0 / g),
        }
    }
}

/// Maps linear radiance to 8-bit display values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMapping {
    pub exposure: f32,
    pub gamma: Gamma,
}

impl Default for ToneMapping {
    fn default() -> Self {
        ToneMapping {
            exposure: 1.0,
            gamma: Gamma::Srgb,
        }
    }
}

impl ToneMapping {
    pub fn validate(&self) -> Result<()> {
        if !(self.exposure.is_finite() && self.exposure > 0.0) {
            return Err(Error::invalid(format!("exposure must be positive, got {}", self.exposure)));
        }
        if let Gamma::Power(g) = self.gamma {
            if !(g.is_finite() && g > 0.0) {
                return Err(Error::invalid(format!("gamma must be positive, got {g}")));
            }
        }
        Ok(())
    }

    pub fn map(&self, v: f32) -> u8 {
        let v = if v.is_finite() { (v * self.exposure).clamp(0.0, 1.0) } else { 0.0 };
        (self.gamma.encode(v) * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

/// Normal in [-1, 1]³ to RGB; the zero vector marks background and maps
/// to black.
pub fn encode_normal(n: [f32; 3]) -> [u8; 3] {
    if n == [0.0; 3] {
        return [0; 3];
    }
    n.map(|c| (((c.clamp(-1.0, 1.0) + 1.0) * 0.5) * 255.0).round() as u8)
}

#[derive(Clone, Debug)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    /// Packed RGB8, row-major.
    pub pixels: Vec<u8>,
    pub role: ImageRole,
}

impl RenderedImage {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let img = RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| Error::invalid("pixel buffer does not match image size"))?;
        img.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// Runs the two renderer phases for a scene and turns the result into an
/// 8-bit image. Owns the execution context for its whole life.
pub struct RenderDriver<R> {
    ctx: ExecutionContext,
    renderer: R,
    tone: ToneMapping,
}

impl<R: Renderer> RenderDriver<R> {
    pub fn new(ctx: ExecutionContext, renderer: R, tone: ToneMapping) -> Result<Self> {
        tone.validate()?;
        Ok(RenderDriver { ctx, renderer, tone })
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn render(&mut self, spec: &SceneSpec, role: ImageRole) -> Result<RenderedImage> {
        let failed = |source: RenderError| Error::RenderFailure { role, source };
        let scene = self.renderer.construct_scene(&self.ctx, spec).map_err(failed)?;
        let camera = &spec.camera;
        let image = self
            .renderer
            .evaluate(&self.ctx, &scene, camera.width, camera.height, camera.spp)
            .map_err(failed)?;
        image.check_size().map_err(failed)?;
        if (image.width, image.height) != (camera.width, camera.height) {
            return Err(failed(RenderError::FilmMismatch {
                width: camera.width,
                height: camera.height,
                got: image.pixels.len(),
            }));
        }
        Ok(self.encode(&image, spec.shading, role))
    }

    fn encode(&self, image: &FloatImage, shading: ShadingMode, role: ImageRole) -> RenderedImage {
        let pixels = image
            .pixels
            .iter()
            .flat_map(|p| match shading {
                ShadingMode::Material => p.map(|c| self.tone.map(c)),
                ShadingMode::NormalVisualization => encode_normal(*p),
            })
            .collect();
        RenderedImage {
            width: image.width,
            height: image.height,
            pixels,
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_layout() {
        assert_eq!(ImageRole::Light { camera: None, index: 3 }.file_name(), "light_3.png");
        assert_eq!(
            ImageRole::Light { camera: Some(2), index: 12 }.file_name(),
            "cam_02_light_12.png"
        );
        assert_eq!(
            ImageRole::GroundTruthNormal { camera: None }.file_name(),
            "ground_truth_normal.png"
        );
        assert_eq!(
            ImageRole::GroundTruthNormal { camera: Some(0) }.file_name(),
            "cam_00_ground_truth_normal.png"
        );
    }

    #[test]
    fn tone_mapping_clamps_and_applies_gamma() {
        let tone = ToneMapping::default();
        assert_eq!(tone.map(-1.0), 0);
        assert_eq!(tone.map(f32::NAN), 0);
        assert_eq!(tone.map(5.0), 255);
        // sRGB midtone lifts 0.5 well above 128
        assert_eq!(tone.map(0.5), 188);
        let linear = ToneMapping {
            exposure: 2.0,
            gamma: Gamma::Linear,
        };
        assert_eq!(linear.map(0.25), 128);
    }

    #[test]
    fn normals_encode_to_half_offset_rgb() {
        assert_eq!(encode_normal([0.0, 0.0, 1.0]), [128, 128, 255]);
        assert_eq!(encode_normal([-1.0, 0.0, 0.0]), [0, 128, 128]);
        assert_eq!(encode_normal([0.0; 3]), [0, 0, 0]);
    }

    #[test]
    fn tone_mapping_validation() {
        assert!(ToneMapping::default().validate().is_ok());
        assert!(ToneMapping { exposure: 0.0, ..Default::default() }.validate().is_err());
        let negative = ToneMapping {
            gamma: Gamma::Power(-2.0),
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn driver_rejects_invalid_tone_mapping() {
        let driver = |tone| {
            let ctx = ExecutionContext::new(crate::renderer::ExecutionMode::Scalar).unwrap();
            RenderDriver::new(ctx, crate::tracer::Tracer::default(), tone)
        };
        assert!(driver(ToneMapping::default()).is_ok());
        let dark = ToneMapping { exposure: 0.0, ..Default::default() };
        assert!(matches!(driver(dark), Err(Error::InvalidParameter(_))));
        let flat = ToneMapping { gamma: Gamma::Power(0.0), ..Default::default() };
        assert!(matches!(driver(flat), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn save_rejects_short_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let image = RenderedImage {
            width: 2,
            height: 2,
            pixels: vec![0; 5],
            role: ImageRole::Light { camera: None, index: 1 },
        };
        assert!(image.save(dir.path().join("x.png")).is_err());
    }
}
