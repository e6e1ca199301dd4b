use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use photometric_dataset::dataset::LightSetup;
use photometric_dataset::placement::PlacementBounds;
use photometric_dataset::{
    AssetCatalog, CameraLayout, DatasetAssembler, ExecutionContext, ExecutionMode,
    GenerationSettings, GeneratorConfig, LightDescriptor, LightPattern, LightfieldConfig, Progress,
    RenderDriver, Tracer,
};

/// Render photometric-stereo datasets from meshes and measured BRDFs
#[derive(Parser, Debug)]
#[command(name = "photometric-dataset", version, about)]
struct Cli {
    /// YAML settings file; command-line flags take precedence
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for generated datasets
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory with .obj/.gltf/.glb meshes
    #[arg(long, global = true)]
    obj_dir: Option<PathBuf>,

    /// Directory with MERL .binary BRDFs
    #[arg(long, global = true)]
    brdf_dir: Option<PathBuf>,

    /// Render threads (0 = all cores, 1 = scalar)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one dataset
    Single {
        #[arg(long)]
        object: String,
        #[arg(long)]
        material: String,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Generate one dataset per object x material pair
    Batch {
        /// Objects to use; all discovered objects when omitted
        #[arg(long, value_delimiter = ',')]
        objects: Vec<String>,
        /// Materials to use; all discovered materials when omitted
        #[arg(long, value_delimiter = ',')]
        materials: Vec<String>,
        #[arg(long)]
        max_datasets: Option<usize>,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Print the objects and materials that can be resolved
    List,
}

#[derive(Args, Debug)]
struct GenerationArgs {
    /// Light placement: hemisphere, circle or grid
    #[arg(long)]
    pattern: Option<String>,
    #[arg(long)]
    num_lights: Option<usize>,
    /// Distance of placed lights from the origin
    #[arg(long)]
    light_radius: Option<f64>,
    #[arg(long)]
    intensity: Option<f64>,
    /// YAML list of lights, used instead of a placement pattern
    #[arg(long, conflicts_with_all = ["pattern", "num_lights", "light_radius", "intensity"])]
    lights: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    spp: Option<u32>,
    /// Horizontal field of view in degrees
    #[arg(long)]
    fov: Option<f64>,
    /// Render a grid x grid light-field camera array
    #[arg(long)]
    lightfield_grid: Option<usize>,
    #[arg(long, default_value_t = 0.5)]
    lightfield_spacing: f64,
    #[arg(long, default_value_t = 5.0)]
    lightfield_distance: f64,
    /// Extra dataset name discriminator
    #[arg(long)]
    variant: Option<String>,
}

impl GenerationArgs {
    fn apply(&self, settings: &mut GenerationSettings) -> Result<()> {
        if let Some(path) = &self.lights {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let lights: Vec<LightDescriptor> =
                serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            settings.lights = LightSetup::Custom { lights };
        } else if self.pattern.is_some()
            || self.num_lights.is_some()
            || self.light_radius.is_some()
            || self.intensity.is_some()
        {
            let current = match &settings.lights {
                LightSetup::Pattern {
                    pattern,
                    count,
                    radius,
                    intensity,
                    bounds,
                } => (*pattern, *count, *radius, *intensity, bounds.clone()),
                LightSetup::Custom { .. } => {
                    (LightPattern::Hemisphere, 4, 2.0, 5.0, PlacementBounds::default())
                }
            };
            let (mut pattern, mut count, mut radius, mut intensity, bounds) = current;
            if let Some(name) = &self.pattern {
                pattern = name.parse()?;
            }
            count = self.num_lights.unwrap_or(count);
            radius = self.light_radius.unwrap_or(radius);
            intensity = self.intensity.unwrap_or(intensity);
            settings.lights = LightSetup::Pattern {
                pattern,
                count,
                radius,
                intensity,
                bounds,
            };
        }
        let quality = &mut settings.quality;
        quality.width = self.width.unwrap_or(quality.width);
        quality.height = self.height.unwrap_or(quality.height);
        quality.spp = self.spp.unwrap_or(quality.spp);
        if let Some(fov) = self.fov {
            settings.camera.fov_deg = fov;
        }
        if let Some(grid_size) = self.lightfield_grid {
            settings.camera.layout = CameraLayout::Lightfield(LightfieldConfig {
                grid_size,
                spacing_x: self.lightfield_spacing,
                spacing_y: self.lightfield_spacing,
                distance: self.lightfield_distance,
                ..Default::default()
            });
        }
        if self.variant.is_some() {
            settings.variant = self.variant.clone();
        }
        Ok(())
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} images {msg}")?
            .progress_chars("##-"),
    );
    Ok(bar)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &cli.obj_dir {
        config.object_dir = dir.clone();
    }
    if let Some(dir) = &cli.brdf_dir {
        config.material_dir = dir.clone();
    }
    if let Some(threads) = cli.threads {
        config.execution = match threads {
            1 => ExecutionMode::Scalar,
            threads => ExecutionMode::Parallel { threads },
        };
    }

    let assets = AssetCatalog::with_builtin_objects()
        .with_object_dir(&config.object_dir)
        .with_material_dir(&config.material_dir);

    if let Command::List = cli.command {
        println!("objects:   {}", assets.discover_objects()?.join(", "));
        println!("materials: {}", assets.discover_materials()?.join(", "));
        return Ok(());
    }

    let ctx = ExecutionContext::new(config.execution).context("starting render threads")?;
    log::info!("rendering on {} threads", ctx.threads());
    let tracer = Tracer {
        filter: config.filter,
        seed: config.seed,
    };
    let driver = RenderDriver::new(ctx, tracer, config.tone_mapping)?;
    let bar = progress_bar()?;
    let observer_bar = bar.clone();
    let mut assembler = DatasetAssembler::new(assets, driver, &config.output_dir)
        .with_reconstruction(config.reconstruction.clone())
        .with_observer(move |progress: &Progress| {
            observer_bar.set_length(progress.total as u64);
            observer_bar.set_position(progress.completed as u64);
            observer_bar.set_message(progress.dataset.clone());
        });

    let mut settings = config.generation.clone();
    match &cli.command {
        Command::Single {
            object,
            material,
            generation,
        } => {
            generation.apply(&mut settings)?;
            let record = assembler
                .generate_dataset(object, material, &settings)
                .with_context(|| format!("generating {object} x {material}"))?;
            bar.finish_and_clear();
            println!(
                "wrote {} ({} images)",
                assembler.dataset_dir(&record.dataset_name).display(),
                record.total_images()
            );
        }
        Command::Batch {
            objects,
            materials,
            max_datasets,
            generation,
        } => {
            generation.apply(&mut settings)?;
            let objects = if objects.is_empty() {
                assembler.assets().discover_objects()?
            } else {
                objects.clone()
            };
            let materials = if materials.is_empty() {
                assembler.assets().discover_materials()?
            } else {
                materials.clone()
            };
            let report = assembler.generate_batch(&objects, &materials, &settings, *max_datasets)?;
            bar.finish_and_clear();
            for outcome in report.failures() {
                if let Err(e) = &outcome.result {
                    eprintln!("failed: {} x {}: {}", outcome.object, outcome.material, e);
                }
            }
            println!(
                "{} datasets written, {} failed",
                report.records().count(),
                report.failures().count()
            );
            if report.records().count() == 0 {
                bail!("no dataset was generated");
            }
        }
        Command::List => {}
    }
    Ok(())
}
