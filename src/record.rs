//! The `config.yaml` written next to every dataset. Downstream
//! reconstruction tools read it, so field names are part of the format.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{Fp, Vec3f};
use crate::scene::{CameraDescriptor, CameraIntrinsics, LightDescriptor, LightfieldConfig};

pub const RECORD_FILE: &str = "config.yaml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    Single,
    Lightfield,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraEntry {
    pub index: usize,
    pub position: Vec3f,
    pub target: Vec3f,
    pub up: Vec3f,
    pub fov: Fp,
    pub intrinsics: CameraIntrinsics,
    pub input_images: Vec<String>,
    pub ground_truth_normal: String,
}

impl CameraEntry {
    pub fn new(
        index: usize,
        camera: &CameraDescriptor,
        input_images: Vec<String>,
        ground_truth_normal: String,
    ) -> Self {
        CameraEntry {
            index,
            position: camera.position,
            target: camera.target,
            up: camera.up,
            fov: camera.fov_deg,
            intrinsics: camera.intrinsics(),
            input_images,
            ground_truth_normal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3f>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Vec3f>,
    pub intensity: Fp,
}

impl LightEntry {
    /// `index` starts at 1, matching the image names.
    pub fn new(index: usize, light: &LightDescriptor) -> Self {
        let (position, direction) = match light {
            LightDescriptor::Point { position, .. } => (Some(*position), None),
            LightDescriptor::Directional { direction, .. } => (None, Some(*direction)),
        };
        LightEntry {
            name: format!("light_{index}"),
            kind: light.kind().to_string(),
            position,
            direction,
            intensity: light.intensity(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightsSection {
    pub count: usize,
    /// Placement pattern name, or `custom` for explicit light lists.
    pub pattern: String,
    pub entries: Vec<LightEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HogRegularization {
    pub enabled: bool,
    pub lambda: Fp,
    pub orientations: u32,
    pub pixels_per_cell: [u32; 2],
    pub cells_per_block: [u32; 2],
}

impl Default for HogRegularization {
    fn default() -> Self {
        HogRegularization {
            enabled: false,
            lambda: 0.2,
            orientations: 9,
            pixels_per_cell: [8, 8],
            cells_per_block: [2, 2],
        }
    }
}

/// Reconstruction knobs copied into every record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionDefaults {
    pub mask_threshold: Fp,
    pub shadow_threshold: Fp,
    pub hog_regularization: HogRegularization,
}

impl Default for ReconstructionDefaults {
    fn default() -> Self {
        ReconstructionDefaults {
            mask_threshold: 0.1,
            shadow_threshold: 0.05,
            hog_regularization: HogRegularization::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionSection {
    pub input_images: Vec<String>,
    pub ground_truth_normal: String,
    pub output_normal_map: String,
    pub mask_threshold: Fp,
    pub shadow_threshold: Fp,
    pub hog_regularization: HogRegularization,
}

impl ReconstructionSection {
    pub fn new(
        defaults: &ReconstructionDefaults,
        input_images: Vec<String>,
        ground_truth_normal: String,
        output_normal_map: String,
    ) -> Self {
        ReconstructionSection {
            input_images,
            ground_truth_normal,
            output_normal_map,
            mask_threshold: defaults.mask_threshold,
            shadow_threshold: defaults.shadow_threshold,
            hog_regularization: defaults.hog_regularization.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub dataset_name: String,
    pub object: String,
    pub material: String,
    /// Unix seconds.
    pub generated_at: u64,
    pub camera_mode: CameraMode,
    pub image_size: [u32; 2],
    pub samples_per_pixel: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lightfield: Option<LightfieldConfig>,
    pub cameras: Vec<CameraEntry>,
    pub lights: LightsSection,
    pub reconstruction: ReconstructionSection,
}

impl DatasetRecord {
    /// Writes through a temporary file so readers never see a partial record.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        let tmp = path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn total_images(&self) -> usize {
        self.cameras.iter().map(|c| c.input_images.len() + 1).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_entries_carry_either_position_or_direction() {
        let point = LightEntry::new(1, &LightDescriptor::point(Vec3f::new(1.0, 2.0, 3.0), 5.0));
        assert_eq!(point.name, "light_1");
        assert_eq!(point.kind, "point");
        assert!(point.direction.is_none());
        let yaml = serde_yaml::to_string(&point).unwrap();
        assert!(yaml.contains("type: point"));
        assert!(!yaml.contains("direction"));

        let directional = LightEntry::new(2, &LightDescriptor::directional(Vec3f::z(), 1.5));
        assert_eq!(directional.direction, Some(Vec3f::z()));
        assert!(directional.position.is_none());
    }

    #[test]
    fn reconstruction_defaults_match_downstream_expectations() {
        let yaml = serde_yaml::to_string(&ReconstructionDefaults::default()).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["mask_threshold"].as_f64(), Some(0.1));
        assert_eq!(parsed["shadow_threshold"].as_f64(), Some(0.05));
        assert_eq!(parsed["hog_regularization"]["orientations"].as_u64(), Some(9));
        assert_eq!(parsed["hog_regularization"]["enabled"].as_bool(), Some(false));

        let partial: ReconstructionDefaults =
            serde_yaml::from_str("mask_threshold: 0.3\n").unwrap();
        assert_eq!(partial.mask_threshold, 0.3);
        assert_eq!(partial.hog_regularization, HogRegularization::default());
    }
}
