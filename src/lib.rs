//! Synthetic photometric-stereo datasets: one object under one measured
//! material, lit from a set of placed lights and seen from one camera or a
//! light-field grid, plus ground-truth normal maps and a YAML record.

extern crate nalgebra as na;

pub mod aabb;
pub mod assets;
pub mod bvh;
pub mod config;
pub mod dataset;
pub mod distributions;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod gltf_to_model;
pub mod material;
pub mod merl;
pub mod mesh;
pub mod placement;
pub mod record;
pub mod renderer;
pub mod scene;
pub mod tracer;
mod utils;

pub use assets::AssetCatalog;
pub use config::GeneratorConfig;
pub use dataset::{
    dataset_name, BatchReport, CameraConfig, CameraLayout, CancelToken, DatasetAssembler,
    DatasetState, GenerationSettings, LightSetup, Progress, Quality,
};
pub use driver::{ImageRole, RenderDriver, RenderedImage, ToneMapping};
pub use error::{Error, Result};
pub use placement::{generate_lightfield_positions, place_lights, LightPattern};
pub use record::DatasetRecord;
pub use renderer::{ExecutionContext, ExecutionMode, Renderer};
pub use scene::{
    build_scene, CameraDescriptor, LightDescriptor, LightfieldConfig, SceneSpec, ShadingMode,
};
pub use tracer::Tracer;
