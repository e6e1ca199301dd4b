use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::GenerationSettings;
use crate::distributions::PixelFilter;
use crate::driver::ToneMapping;
use crate::error::Result;
use crate::record::ReconstructionDefaults;
use crate::renderer::ExecutionMode;

/// Generator settings file. Every field is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub object_dir: PathBuf,
    pub material_dir: PathBuf,
    pub execution: ExecutionMode,
    pub tone_mapping: ToneMapping,
    pub filter: PixelFilter,
    pub seed: u64,
    pub reconstruction: ReconstructionDefaults,
    pub generation: GenerationSettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            output_dir: PathBuf::from("renders"),
            object_dir: PathBuf::from("objects"),
            material_dir: PathBuf::from("brdfs"),
            execution: ExecutionMode::default(),
            tone_mapping: ToneMapping::default(),
            filter: PixelFilter::default(),
            seed: 0,
            reconstruction: ReconstructionDefaults::default(),
            generation: GenerationSettings::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: GeneratorConfig = serde_yaml::from_str(&text)?;
        config.tone_mapping.validate()?;
        log::debug!("loaded {}", path.as_ref().display());
        Ok(config)
    }
}
