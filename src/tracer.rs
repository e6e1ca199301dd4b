//! Direct-lighting ray tracer: one bounce, hard shadows, no emission.

use std::sync::Arc;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::bvh::{create_bvh_tree, BvhTree, Primitive};
use crate::distributions::PixelFilter;
use crate::geometry::{Fp, Ray, Vec3f, FP_INF};
use crate::material::Reflectance;
use crate::renderer::{ExecutionContext, FloatImage, RenderError, Renderer};
use crate::scene::{CameraDescriptor, CameraFrame, LightDescriptor, SceneSpec, ShadingMode};
use crate::utils::mix_seed;

const SHADOW_BIAS: Fp = 1e-4;

#[derive(Clone, Debug)]
pub struct Tracer {
    pub filter: PixelFilter,
    pub seed: u64,
}

impl Default for Tracer {
    fn default() -> Self {
        Tracer {
            filter: PixelFilter::default(),
            seed: 0,
        }
    }
}

impl Tracer {
    pub fn new(filter: PixelFilter) -> Self {
        Tracer { filter, seed: 0 }
    }
}

pub struct TracedScene {
    bvh: BvhTree,
    camera: CameraDescriptor,
    frame: CameraFrame,
    lights: Vec<LightDescriptor>,
    reflectance: Arc<Reflectance>,
    shading: ShadingMode,
}

impl TracedScene {
    fn camera_ray(&self, x: Fp, y: Fp, width: u32, height: u32) -> Ray {
        let w = width as Fp;
        let h = height as Fp;
        let tan_x = self.camera.tan_half_fov_x();
        let tan_y = tan_x * h / w;
        let px = (2.0 * x / w - 1.0) * tan_x;
        let py = -(2.0 * y / h - 1.0) * tan_y;
        let direction = px * self.frame.right + py * self.frame.up + self.frame.forward;
        Ray {
            origin: self.camera.position,
            direction: direction.normalize(),
        }
    }

    fn visible(&self, point: &Vec3f, normal: &Vec3f, direction: &Vec3f, distance: Fp) -> bool {
        let shadow = Ray {
            origin: point + normal * SHADOW_BIAS,
            direction: *direction,
        };
        !self.bvh.occluded(&shadow, distance - SHADOW_BIAS)
    }

    fn radiance(&self, ray: &Ray) -> Vec3f {
        let Some(hit) = self.bvh.closest_hit(ray, FP_INF) else {
            return Vec3f::zeros();
        };
        let point = ray.at(hit.offset);
        let wo = -ray.direction;
        let normal = if hit.normal.dot(&wo) < 0.0 { -hit.normal } else { hit.normal };
        let mut result = Vec3f::zeros();
        for light in &self.lights {
            let (wi, distance, irradiance) = match light {
                LightDescriptor::Point { position, intensity } => {
                    let to_light = position - point;
                    let distance = to_light.norm();
                    (to_light / distance, distance, intensity / (distance * distance))
                }
                LightDescriptor::Directional {
                    direction,
                    intensity,
                } => (*direction, FP_INF, *intensity),
            };
            let cos = normal.dot(&wi);
            if cos <= 0.0 || !self.visible(&point, &normal, &wi, distance) {
                continue;
            }
            let f = self.reflectance.eval(&normal, &wi, &wo);
            result += f * (irradiance * cos);
        }
        result
    }

    fn facing_normal(&self, ray: &Ray) -> Option<Vec3f> {
        let hit = self.bvh.closest_hit(ray, FP_INF)?;
        Some(if hit.normal.dot(&ray.direction) > 0.0 { -hit.normal } else { hit.normal })
    }
}

impl Tracer {
    fn pixel(
        &self,
        scene: &TracedScene,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        spp: u32,
    ) -> [f32; 3] {
        let pixel_id = ((y as u64) << 32) | x as u64;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(mix_seed(self.seed ^ mix_seed(pixel_id)));
        let mut sum = Vec3f::zeros();
        let mut hits = 0u32;
        for _ in 0..spp {
            let (dx, dy) = self.filter.offset(&mut rng);
            let ray = scene.camera_ray(x as Fp + 0.5 + dx, y as Fp + 0.5 + dy, width, height);
            match scene.shading {
                ShadingMode::Material => sum += scene.radiance(&ray),
                ShadingMode::NormalVisualization => {
                    if let Some(normal) = scene.facing_normal(&ray) {
                        sum += normal;
                        hits += 1;
                    }
                }
            }
        }
        let value = match scene.shading {
            ShadingMode::Material => sum / spp as Fp,
            // background unless most of the footprint is covered
            ShadingMode::NormalVisualization if 2 * hits < spp => Vec3f::zeros(),
            ShadingMode::NormalVisualization => {
                sum.try_normalize(1e-12).unwrap_or_else(Vec3f::zeros)
            }
        };
        [value.x as f32, value.y as f32, value.z as f32]
    }
}

impl Renderer for Tracer {
    type Scene = TracedScene;

    fn construct_scene(
        &mut self,
        ctx: &ExecutionContext,
        spec: &SceneSpec,
    ) -> Result<TracedScene, RenderError> {
        if spec.object.model.is_empty() {
            return Err(RenderError::InvalidScene(format!(
                "object `{}` has no geometry",
                spec.object.name
            )));
        }
        let primitives = spec.object.model.objects.iter().cloned().map(Primitive::from).collect();
        let bvh = ctx.install(|| create_bvh_tree(primitives));
        log::trace!("bvh over {} primitives for `{}`", bvh.len(), spec.object.name);
        Ok(TracedScene {
            bvh,
            frame: spec.camera.frame(),
            camera: spec.camera.clone(),
            lights: spec.lights.clone(),
            reflectance: spec.material.reflectance.clone(),
            shading: spec.shading,
        })
    }

    fn evaluate(
        &mut self,
        ctx: &ExecutionContext,
        scene: &TracedScene,
        width: u32,
        height: u32,
        spp: u32,
    ) -> Result<FloatImage, RenderError> {
        if width == 0 || height == 0 || spp == 0 {
            return Err(RenderError::InvalidScene(format!(
                "cannot render {width}x{height} at {spp} spp"
            )));
        }
        let mut image = FloatImage::new(width, height);
        let tracer = &*self;
        ctx.install(|| {
            image
                .pixels
                .par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, pixel) in row.iter_mut().enumerate() {
                        *pixel = tracer.pixel(scene, x as u32, y as u32, width, height, spp);
                    }
                })
        });
        Ok(image)
    }
}
