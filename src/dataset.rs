//! Turns (object, material) pairs into dataset directories: one image per
//! light per camera, a ground-truth normal map per camera, and a
//! `config.yaml` record written last.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::assets::AssetCatalog;
use crate::driver::{ImageRole, RenderDriver};
use crate::error::{Error, Result};
use crate::geometry::{Fp, Vec3f};
use crate::placement::{place_lights_within, LightPattern, PlacementBounds};
use crate::record::{
    CameraEntry, CameraMode, DatasetRecord, LightEntry, LightsSection, ReconstructionDefaults,
    ReconstructionSection, RECORD_FILE,
};
use crate::renderer::Renderer;
use crate::scene::{build_scene, CameraDescriptor, LightDescriptor, LightfieldConfig};

pub const IMAGES_DIR: &str = "images";
pub const OUTPUT_DIR: &str = "output";
const OUTPUT_NORMAL_MAP: &str = "normal_map.png";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CameraLayout {
    Single { position: Vec3f, target: Vec3f },
    Lightfield(LightfieldConfig),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: Fp,
    pub up: Vec3f,
    pub layout: CameraLayout,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            fov_deg: 45.0,
            up: Vec3f::y(),
            layout: CameraLayout::Single {
                position: Vec3f::new(0.0, 0.0, 5.0),
                target: Vec3f::zeros(),
            },
        }
    }
}

impl CameraConfig {
    pub fn cameras(&self, quality: &Quality) -> Result<Vec<CameraDescriptor>> {
        match &self.layout {
            CameraLayout::Single { position, target } => {
                let camera = CameraDescriptor {
                    position: *position,
                    target: *target,
                    up: self.up,
                    fov_deg: self.fov_deg,
                    width: quality.width,
                    height: quality.height,
                    spp: quality.spp,
                };
                camera.validate()?;
                Ok(vec![camera])
            }
            CameraLayout::Lightfield(lightfield) => {
                let template = CameraDescriptor {
                    position: Vec3f::new(
                        lightfield.center_x,
                        lightfield.center_y,
                        lightfield.distance,
                    ),
                    target: lightfield.target,
                    up: self.up,
                    fov_deg: self.fov_deg,
                    width: quality.width,
                    height: quality.height,
                    spp: quality.spp,
                };
                lightfield.cameras(&template)
            }
        }
    }

    fn mode(&self) -> CameraMode {
        match self.layout {
            CameraLayout::Single { .. } => CameraMode::Single,
            CameraLayout::Lightfield(_) => CameraMode::Lightfield,
        }
    }

    fn lightfield(&self) -> Option<&LightfieldConfig> {
        match &self.layout {
            CameraLayout::Lightfield(lightfield) => Some(lightfield),
            CameraLayout::Single { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LightSetup {
    /// Point lights placed by a pattern, all with the same intensity.
    Pattern {
        pattern: LightPattern,
        count: usize,
        radius: Fp,
        intensity: Fp,
        #[serde(default)]
        bounds: PlacementBounds,
    },
    Custom { lights: Vec<LightDescriptor> },
}

impl Default for LightSetup {
    fn default() -> Self {
        LightSetup::Pattern {
            pattern: LightPattern::Hemisphere,
            count: 4,
            radius: 2.0,
            intensity: 5.0,
            bounds: PlacementBounds::default(),
        }
    }
}

impl LightSetup {
    /// Validated lights in image order. A zero count is allowed here and
    /// yields a normal-only dataset.
    pub fn resolve(&self) -> Result<Vec<LightDescriptor>> {
        match self {
            LightSetup::Pattern { count: 0, radius, bounds, .. } => {
                if !(radius.is_finite() && *radius > 0.0) {
                    return Err(Error::invalid(format!(
                        "light radius must be positive, got {radius}"
                    )));
                }
                bounds.validate()?;
                Ok(Vec::new())
            }
            LightSetup::Pattern {
                pattern,
                count,
                radius,
                intensity,
                bounds,
            } => place_lights_within(*pattern, *count, *radius, bounds)?
                .into_iter()
                .map(|position| LightDescriptor::point(position, *intensity).validated())
                .collect(),
            LightSetup::Custom { lights } => {
                lights.iter().map(LightDescriptor::validated).collect()
            }
        }
    }

    fn pattern_name(&self) -> &'static str {
        match self {
            LightSetup::Pattern { pattern, .. } => pattern.name(),
            LightSetup::Custom { .. } => "custom",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    pub width: u32,
    pub height: u32,
    pub spp: u32,
}

impl Default for Quality {
    fn default() -> Self {
        Quality {
            width: 256,
            height: 256,
            spp: 64,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub camera: CameraConfig,
    pub lights: LightSetup,
    pub quality: Quality,
    /// Extra discriminator in the dataset name, for keeping several
    /// configurations of the same pair side by side.
    pub variant: Option<String>,
}

impl GenerationSettings {
    /// Directory name of the dataset these settings produce for a pair.
    /// Light-field layouts without an explicit variant get their grid size
    /// as the discriminator.
    pub fn dataset_name(&self, object: &str, material: &str) -> Result<String> {
        let lightfield_variant = self.camera.lightfield().map(|lf| lf.discriminator());
        let variant = self.variant.as_deref().or(lightfield_variant.as_deref());
        dataset_name(object, material, variant)
    }
}

fn check_name_part(what: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(Error::invalid(format!(
            "{what} name `{value}` cannot be used in a directory name"
        )));
    }
    Ok(())
}

/// The dataset's primary key within an output root.
pub fn dataset_name(object: &str, material: &str, variant: Option<&str>) -> Result<String> {
    check_name_part("object", object)?;
    check_name_part("material", material)?;
    match variant {
        Some(variant) => {
            check_name_part("variant", variant)?;
            Ok(format!("{object}_{material}_{variant}_data"))
        }
        None => Ok(format!("{object}_{material}_data")),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetState {
    Pending,
    RenderingLights { camera: usize },
    RenderingNormal { camera: usize },
    WritingMetadata,
    Done,
    Failed,
}

impl DatasetState {
    pub fn can_advance_to(&self, next: &DatasetState) -> bool {
        use DatasetState::*;
        match (self, next) {
            (Pending, RenderingLights { camera: 0 }) => true,
            (RenderingLights { camera: a }, RenderingNormal { camera: b }) => a == b,
            (RenderingNormal { camera: a }, RenderingLights { camera: b }) => *b == a + 1,
            (RenderingNormal { .. }, WritingMetadata) => true,
            (WritingMetadata, Done) => true,
            (RenderingLights { .. } | RenderingNormal { .. } | WritingMetadata, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetState::Pending => write!(f, "pending"),
            DatasetState::RenderingLights { camera } => {
                write!(f, "rendering lights (camera {camera})")
            }
            DatasetState::RenderingNormal { camera } => {
                write!(f, "rendering normal map (camera {camera})")
            }
            DatasetState::WritingMetadata => write!(f, "writing metadata"),
            DatasetState::Done => write!(f, "done"),
            DatasetState::Failed => write!(f, "failed"),
        }
    }
}

/// Reported after every finished image.
#[derive(Clone, Debug)]
pub struct Progress {
    pub dataset: String,
    pub state: DatasetState,
    pub completed: usize,
    pub total: usize,
    pub role: ImageRole,
}

/// Cooperative cancellation, checked between images.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct DatasetOutcome {
    pub object: String,
    pub material: String,
    pub result: Result<DatasetRecord>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DatasetOutcome>,
    /// Set when the batch stopped early on a cancel request.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn records(&self) -> impl Iterator<Item = &DatasetRecord> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &DatasetOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Everything about a dataset that can be decided without touching assets
/// or the disk.
struct Plan {
    name: String,
    cameras: Vec<CameraDescriptor>,
    lights: Vec<LightDescriptor>,
}

struct Run<'a> {
    name: &'a str,
    state: DatasetState,
    completed: usize,
    total: usize,
}

impl Run<'_> {
    fn advance(&mut self, next: DatasetState) {
        debug_assert!(self.state.can_advance_to(&next), "{} -> {}", self.state, next);
        log::debug!("{}: {} -> {}", self.name, self.state, next);
        self.state = next;
    }
}

type Observer = Box<dyn FnMut(&Progress)>;

pub struct DatasetAssembler<R> {
    assets: AssetCatalog,
    driver: RenderDriver<R>,
    output_root: PathBuf,
    reconstruction: ReconstructionDefaults,
    timestamp: Option<u64>,
    cancel: CancelToken,
    observer: Option<Observer>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn relative(parts: &[&str]) -> String {
    parts.join("/")
}

/// Removes the previous record before the images so an interrupted
/// regeneration never leaves a record next to stale images.
fn prepare_directory(dataset_dir: &Path) -> Result<()> {
    let record = dataset_dir.join(RECORD_FILE);
    if record.exists() {
        std::fs::remove_file(&record)?;
    }
    let images = dataset_dir.join(IMAGES_DIR);
    if images.exists() {
        std::fs::remove_dir_all(&images)?;
    }
    std::fs::create_dir_all(&images)?;
    std::fs::create_dir_all(dataset_dir.join(OUTPUT_DIR))?;
    Ok(())
}

impl<R: Renderer> DatasetAssembler<R> {
    pub fn new(
        assets: AssetCatalog,
        driver: RenderDriver<R>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        DatasetAssembler {
            assets,
            driver,
            output_root: output_root.into(),
            reconstruction: ReconstructionDefaults::default(),
            timestamp: None,
            cancel: CancelToken::default(),
            observer: None,
        }
    }

    pub fn with_reconstruction(mut self, reconstruction: ReconstructionDefaults) -> Self {
        self.reconstruction = reconstruction;
        self
    }

    /// Stamp every record with `seconds` instead of the wall clock, making
    /// regenerated records byte-identical.
    pub fn with_fixed_timestamp(mut self, seconds: u64) -> Self {
        self.timestamp = Some(seconds);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_observer(mut self, observer: impl FnMut(&Progress) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn assets(&self) -> &AssetCatalog {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetCatalog {
        &mut self.assets
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn dataset_dir(&self, name: &str) -> PathBuf {
        self.output_root.join(name)
    }

    fn plan(&self, object: &str, material: &str, settings: &GenerationSettings) -> Result<Plan> {
        let cameras = settings.camera.cameras(&settings.quality)?;
        let lights = settings.lights.resolve()?;
        let name = settings.dataset_name(object, material)?;
        Ok(Plan { name, cameras, lights })
    }

    fn notify(&mut self, run: &Run, role: ImageRole) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&Progress {
                dataset: run.name.to_string(),
                state: run.state,
                completed: run.completed,
                total: run.total,
                role,
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_image(
        &mut self,
        run: &mut Run,
        object: &str,
        material: &str,
        camera: &CameraDescriptor,
        lights: &[LightDescriptor],
        role: ImageRole,
        dataset_dir: &Path,
    ) -> Result<String> {
        if self.cancel.is_cancelled() {
            log::warn!("{}: cancelled after {} of {} images", run.name, run.completed, run.total);
            return Err(Error::Cancelled {
                completed: run.completed,
            });
        }
        let spec = build_scene(&self.assets, object, material, camera, lights, role.shading())?;
        let image = self.driver.render(&spec, role)?;
        let file_name = role.file_name();
        image.save(dataset_dir.join(IMAGES_DIR).join(&file_name))?;
        run.completed += 1;
        log::info!("{}: [{}/{}] {}", run.name, run.completed, run.total, file_name);
        self.notify(run, role);
        Ok(relative(&[run.name, IMAGES_DIR, file_name.as_str()]))
    }

    /// Generates one dataset. Argument and asset problems are reported
    /// before anything is written.
    pub fn generate_dataset(
        &mut self,
        object: &str,
        material: &str,
        settings: &GenerationSettings,
    ) -> Result<DatasetRecord> {
        let plan = self.plan(object, material, settings)?;
        self.assets.load_object(object)?;
        self.assets.load_material(material)?;

        let dataset_dir = self.dataset_dir(&plan.name);
        log::info!(
            "generating {} ({} cameras x {} lights) in {}",
            plan.name,
            plan.cameras.len(),
            plan.lights.len(),
            dataset_dir.display()
        );
        prepare_directory(&dataset_dir)?;

        let mut run = Run {
            name: &plan.name,
            state: DatasetState::Pending,
            completed: 0,
            total: plan.cameras.len() * (plan.lights.len() + 1),
        };
        let lightfield = settings.camera.lightfield().is_some();
        let mut camera_entries = Vec::with_capacity(plan.cameras.len());
        for (index, camera) in plan.cameras.iter().enumerate() {
            let camera_tag = lightfield.then_some(index);
            let rendered = self.render_camera(
                &mut run,
                object,
                material,
                camera,
                camera_tag,
                &plan.lights,
                &dataset_dir,
            );
            let (input_images, ground_truth_normal) = match rendered {
                Ok(paths) => paths,
                Err(e) => {
                    run.advance(DatasetState::Failed);
                    log::error!("{}: {}", plan.name, e);
                    return Err(e);
                }
            };
            camera_entries.push(CameraEntry::new(index, camera, input_images, ground_truth_normal));
        }

        run.advance(DatasetState::WritingMetadata);
        let record = self.record(object, material, settings, &plan, camera_entries);
        if let Err(e) = record.save(dataset_dir.join(RECORD_FILE)) {
            run.advance(DatasetState::Failed);
            return Err(e);
        }
        run.advance(DatasetState::Done);
        log::info!("{}: done, {} images", plan.name, run.completed);
        Ok(record)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_camera(
        &mut self,
        run: &mut Run,
        object: &str,
        material: &str,
        camera: &CameraDescriptor,
        camera_tag: Option<usize>,
        lights: &[LightDescriptor],
        dataset_dir: &Path,
    ) -> Result<(Vec<String>, String)> {
        let index = camera_tag.unwrap_or(0);
        run.advance(DatasetState::RenderingLights { camera: index });
        let mut input_images = Vec::with_capacity(lights.len());
        for (i, light) in lights.iter().enumerate() {
            let role = ImageRole::Light {
                camera: camera_tag,
                index: i + 1,
            };
            let active = std::slice::from_ref(light);
            let path =
                self.render_image(run, object, material, camera, active, role, dataset_dir)?;
            input_images.push(path);
        }
        run.advance(DatasetState::RenderingNormal { camera: index });
        let role = ImageRole::GroundTruthNormal { camera: camera_tag };
        let normal = self.render_image(run, object, material, camera, &[], role, dataset_dir)?;
        Ok((input_images, normal))
    }

    fn record(
        &self,
        object: &str,
        material: &str,
        settings: &GenerationSettings,
        plan: &Plan,
        cameras: Vec<CameraEntry>,
    ) -> DatasetRecord {
        let (input_images, ground_truth_normal) = cameras
            .first()
            .map(|c| (c.input_images.clone(), c.ground_truth_normal.clone()))
            .unwrap_or_default();
        let quality = &settings.quality;
        DatasetRecord {
            dataset_name: plan.name.clone(),
            object: object.to_string(),
            material: material.to_string(),
            generated_at: self.timestamp.unwrap_or_else(unix_now),
            camera_mode: settings.camera.mode(),
            image_size: [quality.width, quality.height],
            samples_per_pixel: quality.spp,
            lightfield: settings.camera.lightfield().cloned(),
            cameras,
            lights: LightsSection {
                count: plan.lights.len(),
                pattern: settings.lights.pattern_name().to_string(),
                entries: plan
                    .lights
                    .iter()
                    .enumerate()
                    .map(|(i, light)| LightEntry::new(i + 1, light))
                    .collect(),
            },
            reconstruction: ReconstructionSection::new(
                &self.reconstruction,
                input_images,
                ground_truth_normal,
                relative(&[plan.name.as_str(), OUTPUT_DIR, OUTPUT_NORMAL_MAP]),
            ),
        }
    }

    /// One dataset per distinct (object, material) pair, in input order.
    /// A failing pair is recorded and the batch moves on; settings that
    /// would fail every pair are rejected before anything renders.
    pub fn generate_batch(
        &mut self,
        objects: &[String],
        materials: &[String],
        settings: &GenerationSettings,
        max_datasets: Option<usize>,
    ) -> Result<BatchReport> {
        if objects.is_empty() || materials.is_empty() {
            return Err(Error::invalid("batch needs at least one object and one material"));
        }
        if max_datasets == Some(0) {
            return Err(Error::invalid("max_datasets must be at least 1"));
        }
        settings.camera.cameras(&settings.quality)?;
        settings.lights.resolve()?;
        if let Some(variant) = &settings.variant {
            check_name_part("variant", variant)?;
        }

        let mut seen = HashSet::new();
        let pairs: Vec<(&String, &String)> = objects
            .iter()
            .flat_map(|o| materials.iter().map(move |m| (o, m)))
            .filter(|pair| seen.insert(*pair))
            .take(max_datasets.unwrap_or(usize::MAX))
            .collect();
        log::info!("batch of {} datasets", pairs.len());

        // Underscores in names make `{object}_{material}` ambiguous, so a
        // directory is claimed by the first pair that maps to it.
        let mut claimed: HashMap<String, (&String, &String)> = HashMap::new();
        let mut report = BatchReport::default();
        for (index, &(object, material)) in pairs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            log::info!("[{}/{}] {} x {}", index + 1, pairs.len(), object, material);
            let collision = match settings.dataset_name(object, material) {
                Ok(name) => match claimed.get(&name) {
                    Some((first_object, first_material)) => Some(Error::invalid(format!(
                        "dataset `{name}` is already produced by {first_object} x {first_material}"
                    ))),
                    None => {
                        claimed.insert(name, (object, material));
                        None
                    }
                },
                Err(_) => None,
            };
            let result = match collision {
                Some(e) => Err(e),
                None => self.generate_dataset(object, material, settings),
            };
            let cancelled = matches!(result, Err(Error::Cancelled { .. }));
            if let Err(e) = &result {
                log::error!("{object} x {material} failed: {e}");
            }
            report.outcomes.push(DatasetOutcome {
                object: object.to_string(),
                material: material.to_string(),
                result,
            });
            if cancelled {
                report.cancelled = true;
                break;
            }
        }
        log::info!(
            "batch finished: {} succeeded, {} failed",
            report.records().count(),
            report.failures().count()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_names() {
        assert_eq!(dataset_name("sphere", "aluminium", None).unwrap(), "sphere_aluminium_data");
        assert_eq!(
            dataset_name("bunny", "gold", Some("lf3x3")).unwrap(),
            "bunny_gold_lf3x3_data"
        );
        let bad = [
            ("", "gold", None),
            ("a/b", "gold", None),
            ("cube", "..", None),
            ("cube", "gold", Some("x\\y")),
        ];
        for (o, m, v) in bad {
            assert!(matches!(dataset_name(o, m, v), Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn state_transitions() {
        use DatasetState::*;
        assert!(Pending.can_advance_to(&RenderingLights { camera: 0 }));
        assert!(RenderingLights { camera: 0 }.can_advance_to(&RenderingNormal { camera: 0 }));
        assert!(RenderingNormal { camera: 0 }.can_advance_to(&RenderingLights { camera: 1 }));
        assert!(RenderingNormal { camera: 1 }.can_advance_to(&WritingMetadata));
        assert!(WritingMetadata.can_advance_to(&Done));
        assert!(RenderingLights { camera: 2 }.can_advance_to(&Failed));
        assert!(!Failed.can_advance_to(&RenderingLights { camera: 0 }));
        assert!(!Pending.can_advance_to(&Done));
        assert!(!RenderingNormal { camera: 0 }.can_advance_to(&RenderingLights { camera: 0 }));
    }

    #[test]
    fn zero_lights_resolve_to_empty_list() {
        let setup = LightSetup::Pattern {
            pattern: LightPattern::Grid,
            count: 0,
            radius: 2.0,
            intensity: 1.0,
            bounds: PlacementBounds::default(),
        };
        assert!(setup.resolve().unwrap().is_empty());
        let bad_radius = LightSetup::Pattern {
            pattern: LightPattern::Grid,
            count: 0,
            radius: -1.0,
            intensity: 1.0,
            bounds: PlacementBounds::default(),
        };
        assert!(bad_radius.resolve().is_err());
    }

    #[test]
    fn pattern_lights_share_intensity() {
        let lights = LightSetup::default().resolve().unwrap();
        assert_eq!(lights.len(), 4);
        assert!(lights.iter().all(|l| l.intensity() == 5.0 && l.kind() == "point"));
    }

    #[test]
    fn settings_read_from_yaml() {
        let yaml = r#"
camera:
  fov_deg: 30.0
  layout:
    mode: lightfield
    grid_size: 2
    spacing_x: 0.4
    spacing_y: 0.4
    center_x: 0.0
    center_y: 0.0
    distance: 4.0
    target: [0.0, 0.0, 0.0]
lights:
  kind: pattern
  pattern: circle
  count: 6
  radius: 3.0
  intensity: 10.0
quality:
  width: 64
  height: 64
"#;
        let settings: GenerationSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.camera.fov_deg, 30.0);
        assert_eq!(settings.camera.up, Vec3f::y());
        assert_eq!(settings.quality.spp, 64);
        assert_eq!(settings.camera.cameras(&settings.quality).unwrap().len(), 4);
        assert_eq!(settings.lights.resolve().unwrap().len(), 6);
        assert_eq!(settings.lights.pattern_name(), "circle");
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
