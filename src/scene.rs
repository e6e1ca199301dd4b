use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::AssetCatalog;
use crate::error::{Error, Result};
use crate::geometry::{Fp, Vec3f, EPS};
use crate::material::Reflectance;
use crate::mesh::Model;
use crate::placement::generate_lightfield_positions;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LightDescriptor {
    Point { position: Vec3f, intensity: Fp },
    /// `direction` points from the object toward the light.
    Directional { direction: Vec3f, intensity: Fp },
}

impl LightDescriptor {
    pub fn point(position: Vec3f, intensity: Fp) -> Self {
        LightDescriptor::Point {
            position,
            intensity,
        }
    }

    pub fn directional(direction: Vec3f, intensity: Fp) -> Self {
        LightDescriptor::Directional {
            direction,
            intensity,
        }
    }

    pub fn intensity(&self) -> Fp {
        match self {
            LightDescriptor::Point { intensity, .. }
            | LightDescriptor::Directional { intensity, .. } => *intensity,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LightDescriptor::Point { .. } => "point",
            LightDescriptor::Directional { .. } => "directional",
        }
    }

    /// Checks intensity and geometry; directional lights come back with a
    /// unit direction.
    pub fn validated(&self) -> Result<LightDescriptor> {
        let intensity = self.intensity();
        if !(intensity.is_finite() && intensity > 0.0) {
            return Err(Error::invalid(format!(
                "light intensity must be positive, got {intensity}"
            )));
        }
        match self {
            LightDescriptor::Point { position, .. } => {
                if !position.iter().all(|c| c.is_finite()) {
                    return Err(Error::invalid("point light position must be finite"));
                }
                Ok(self.clone())
            }
            LightDescriptor::Directional { direction, .. } => {
                let direction = direction
                    .try_normalize(EPS)
                    .filter(|d| d.iter().all(|c| c.is_finite()))
                    .ok_or_else(|| Error::invalid("directional light needs a non-zero direction"))?;
                Ok(LightDescriptor::Directional {
                    direction,
                    intensity,
                })
            }
        }
    }
}

/// Pinhole camera intrinsics in pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: Fp,
    pub fy: Fp,
    pub cx: Fp,
    pub cy: Fp,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraDescriptor {
    pub position: Vec3f,
    pub target: Vec3f,
    pub up: Vec3f,
    /// Horizontal field of view.
    pub fov_deg: Fp,
    pub width: u32,
    pub height: u32,
    pub spp: u32,
}

/// Orthonormal look-at frame of a camera.
#[derive(Clone, Debug)]
pub struct CameraFrame {
    pub forward: Vec3f,
    pub right: Vec3f,
    pub up: Vec3f,
}

impl CameraDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(format!(
                "image size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.spp == 0 {
            return Err(Error::invalid("samples per pixel must be at least 1"));
        }
        if !(self.fov_deg.is_finite() && self.fov_deg > 0.0 && self.fov_deg < 180.0) {
            return Err(Error::invalid(format!(
                "field of view must lie in (0, 180) degrees, got {}",
                self.fov_deg
            )));
        }
        let finite = |v: &Vec3f| v.iter().all(|c| c.is_finite());
        if !finite(&self.position) || !finite(&self.target) || !finite(&self.up) {
            return Err(Error::invalid("camera vectors must be finite"));
        }
        if (self.target - self.position).norm() < EPS {
            return Err(Error::invalid("camera position and target coincide"));
        }
        if self.up.norm() < EPS {
            return Err(Error::invalid("camera up vector must be non-zero"));
        }
        Ok(())
    }

    pub fn frame(&self) -> CameraFrame {
        let forward = (self.target - self.position).normalize();
        let right = forward
            .cross(&self.up)
            .try_normalize(EPS)
            // up parallel to the view direction: pick any perpendicular
            .unwrap_or_else(|| {
                let fallback = if forward.z.abs() < 0.9 { Vec3f::z() } else { Vec3f::x() };
                forward.cross(&fallback).normalize()
            });
        let up = right.cross(&forward);
        CameraFrame { forward, right, up }
    }

    pub fn tan_half_fov_x(&self) -> Fp {
        (self.fov_deg.to_radians() * 0.5).tan()
    }

    pub fn tan_half_fov_y(&self) -> Fp {
        self.tan_half_fov_x() * self.height as Fp / self.width as Fp
    }

    pub fn intrinsics(&self) -> CameraIntrinsics {
        let focal = self.width as Fp / (2.0 * self.tan_half_fov_x());
        CameraIntrinsics {
            fx: focal,
            fy: focal,
            cx: self.width as Fp / 2.0,
            cy: self.height as Fp / 2.0,
            width: self.width,
            height: self.height,
        }
    }
}

/// A `grid_size`² array of cameras in a plane at height `distance`, all
/// looking at `target`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightfieldConfig {
    pub grid_size: usize,
    pub spacing_x: Fp,
    pub spacing_y: Fp,
    pub center_x: Fp,
    pub center_y: Fp,
    pub distance: Fp,
    pub target: Vec3f,
}

impl Default for LightfieldConfig {
    fn default() -> Self {
        LightfieldConfig {
            grid_size: 3,
            spacing_x: 0.5,
            spacing_y: 0.5,
            center_x: 0.0,
            center_y: 0.0,
            distance: 5.0,
            target: Vec3f::zeros(),
        }
    }
}

impl LightfieldConfig {
    pub fn positions(&self) -> Result<Vec<Vec3f>> {
        generate_lightfield_positions(
            self.grid_size,
            self.spacing_x,
            self.spacing_y,
            self.center_x,
            self.center_y,
            self.distance,
        )
    }

    /// One camera per grid cell; optics and film come from `template`.
    pub fn cameras(&self, template: &CameraDescriptor) -> Result<Vec<CameraDescriptor>> {
        self.positions()?
            .into_iter()
            .map(|position| {
                let camera = CameraDescriptor {
                    position,
                    target: self.target,
                    ..template.clone()
                };
                camera.validate()?;
                Ok(camera)
            })
            .collect()
    }

    pub fn discriminator(&self) -> String {
        format!("lf{0}x{0}", self.grid_size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadingMode {
    /// Shade with the measured reflectance under the active lights.
    Material,
    /// Ignore reflectance and lights; output the surface normal.
    NormalVisualization,
}

#[derive(Clone, Debug)]
pub struct ObjectRef {
    pub name: String,
    pub model: Arc<Model>,
}

#[derive(Clone, Debug)]
pub struct MaterialRef {
    pub name: String,
    pub reflectance: Arc<Reflectance>,
}

/// Everything one render call needs. Built fresh for every image.
#[derive(Clone, Debug)]
pub struct SceneSpec {
    pub object: ObjectRef,
    pub material: MaterialRef,
    pub camera: CameraDescriptor,
    pub lights: Vec<LightDescriptor>,
    pub shading: ShadingMode,
}

pub fn build_scene(
    assets: &AssetCatalog,
    object_name: &str,
    material_name: &str,
    camera: &CameraDescriptor,
    active_lights: &[LightDescriptor],
    shading: ShadingMode,
) -> Result<SceneSpec> {
    let model = assets.object(object_name)?;
    let reflectance = assets.material(material_name)?;
    camera.validate()?;
    let lights = active_lights
        .iter()
        .map(LightDescriptor::validated)
        .collect::<Result<Vec<_>>>()?;
    Ok(SceneSpec {
        object: ObjectRef {
            name: object_name.to_string(),
            model,
        },
        material: MaterialRef {
            name: material_name.to_string(),
            reflectance,
        },
        camera: camera.clone(),
        lights,
        shading,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetKind;
    use approx::assert_relative_eq;

    fn camera() -> CameraDescriptor {
        CameraDescriptor {
            position: Vec3f::new(0.0, 0.0, 5.0),
            target: Vec3f::zeros(),
            up: Vec3f::y(),
            fov_deg: 45.0,
            width: 64,
            height: 48,
            spp: 4,
        }
    }

    fn catalog() -> AssetCatalog {
        let mut catalog = AssetCatalog::with_builtin_objects();
        catalog.load_object("sphere").unwrap();
        catalog.insert_material("grey", Reflectance::diffuse(Vec3f::new(0.5, 0.5, 0.5)));
        catalog
    }

    #[test]
    fn frame_looks_down_negative_z() {
        let frame = camera().frame();
        assert_relative_eq!(frame.forward, -Vec3f::z(), epsilon = 1e-12);
        assert_relative_eq!(frame.right, Vec3f::x(), epsilon = 1e-12);
        assert_relative_eq!(frame.up, Vec3f::y(), epsilon = 1e-12);
    }

    #[test]
    fn frame_survives_up_parallel_to_view() {
        let looking_down = CameraDescriptor {
            position: Vec3f::new(0.0, 5.0, 0.0),
            ..camera()
        };
        let frame = looking_down.frame();
        assert_relative_eq!(frame.right.dot(&frame.forward), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.up.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn intrinsics_follow_horizontal_fov() {
        let intrinsics = camera().intrinsics();
        let expected = 32.0 / (22.5f64.to_radians().tan());
        assert_relative_eq!(intrinsics.fx, expected, epsilon = 1e-9);
        assert_relative_eq!(intrinsics.fy, expected, epsilon = 1e-9);
        assert_eq!((intrinsics.cx, intrinsics.cy), (32.0, 24.0));
    }

    #[test]
    fn camera_validation() {
        assert!(camera().validate().is_ok());
        for broken in [
            CameraDescriptor { width: 0, ..camera() },
            CameraDescriptor { spp: 0, ..camera() },
            CameraDescriptor { fov_deg: 180.0, ..camera() },
            CameraDescriptor { fov_deg: 0.0, ..camera() },
            CameraDescriptor {
                target: Vec3f::new(0.0, 0.0, 5.0),
                ..camera()
            },
        ] {
            assert!(matches!(broken.validate(), Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn directional_lights_are_normalized() {
        let light = LightDescriptor::directional(Vec3f::new(0.0, 3.0, 4.0), 2.0)
            .validated()
            .unwrap();
        match light {
            LightDescriptor::Directional { direction, .. } => {
                assert_relative_eq!(direction, Vec3f::new(0.0, 0.6, 0.8), epsilon = 1e-12)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(LightDescriptor::point(Vec3f::z(), 0.0).validated().is_err());
        assert!(LightDescriptor::directional(Vec3f::zeros(), 1.0).validated().is_err());
    }

    #[test]
    fn light_descriptors_read_from_yaml() {
        let yaml = r#"
- type: point
  position: [1.0, 2.0, 3.0]
  intensity: 10.0
- type: directional
  direction: [0.0, 0.0, 1.0]
  intensity: 2.5
"#;
        let lights: Vec<LightDescriptor> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            lights,
            vec![
                LightDescriptor::point(Vec3f::new(1.0, 2.0, 3.0), 10.0),
                LightDescriptor::directional(Vec3f::z(), 2.5),
            ]
        );
    }

    #[test]
    fn lightfield_cameras_share_target_and_film() {
        let config = LightfieldConfig {
            grid_size: 2,
            ..Default::default()
        };
        let cameras = config.cameras(&camera()).unwrap();
        assert_eq!(cameras.len(), 4);
        for cam in &cameras {
            assert_eq!(cam.target, config.target);
            assert_eq!((cam.width, cam.height, cam.spp), (64, 48, 4));
            assert_eq!(cam.position.z, 5.0);
        }
        assert_eq!(config.discriminator(), "lf2x2");
    }

    #[test]
    fn empty_light_list_builds_unlit_scene() {
        let catalog = catalog();
        let shading = ShadingMode::Material;
        let scene = build_scene(&catalog, "sphere", "grey", &camera(), &[], shading).unwrap();
        assert!(scene.lights.is_empty());
        assert_eq!(scene.shading, ShadingMode::Material);
        assert_eq!(scene.object.name, "sphere");
    }

    #[test]
    fn unknown_assets_are_reported() {
        let catalog = catalog();
        let err = build_scene(&catalog, "teapot", "grey", &camera(), &[], ShadingMode::Material)
            .unwrap_err();
        assert!(matches!(err, Error::AssetNotFound { kind: AssetKind::Object, .. }));
        let shading = ShadingMode::NormalVisualization;
        let err = build_scene(&catalog, "sphere", "gold", &camera(), &[], shading).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound { kind: AssetKind::Material, .. }));
    }
}
