//! The seam between scene descriptions and whatever turns them into pixels.

use serde::{Deserialize, Serialize};

use crate::scene::SceneSpec;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("scene cannot be rendered: {0}")]
    InvalidScene(String),

    #[error("renderer produced {got} pixels for a {width}x{height} film")]
    FilmMismatch { width: u32, height: u32, got: usize },

    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Backend(String),
}

/// Linear radiance, row-major, top row first.
#[derive(Clone, Debug)]
pub struct FloatImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 3]>,
}

impl FloatImage {
    pub fn new(width: u32, height: u32) -> Self {
        FloatImage {
            width,
            height,
            pixels: vec![[0.0; 3]; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn check_size(&self) -> Result<(), RenderError> {
        let expected = self.width as usize * self.height as usize;
        if self.pixels.len() != expected {
            return Err(RenderError::FilmMismatch {
                width: self.width,
                height: self.height,
                got: self.pixels.len(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ExecutionMode {
    Scalar,
    /// `threads == 0` means one per available core.
    Parallel { threads: usize },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Parallel { threads: 0 }
    }
}

/// Owns the worker pool every render call runs on. Created once and handed
/// to a single driver; nothing else touches it.
pub struct ExecutionContext {
    mode: ExecutionMode,
    pool: rayon::ThreadPool,
}

impl ExecutionContext {
    pub fn new(mode: ExecutionMode) -> Result<Self, RenderError> {
        let threads = match mode {
            ExecutionMode::Scalar => 1,
            ExecutionMode::Parallel { threads } => threads,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("render-{i}"))
            .build()?;
        log::debug!("execution context {:?} with {} threads", mode, pool.current_num_threads());
        Ok(ExecutionContext { mode, pool })
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn install<T: Send>(&self, job: impl FnOnce() -> T + Send) -> T {
        self.pool.install(job)
    }
}

/// Two-phase rendering: build backend-specific state from a description,
/// then evaluate it into a linear float image.
pub trait Renderer {
    type Scene;

    fn construct_scene(
        &mut self,
        ctx: &ExecutionContext,
        spec: &SceneSpec,
    ) -> Result<Self::Scene, RenderError>;

    fn evaluate(
        &mut self,
        ctx: &ExecutionContext,
        scene: &Self::Scene,
        width: u32,
        height: u32,
        spp: u32,
    ) -> Result<FloatImage, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_context_has_one_thread() {
        let ctx = ExecutionContext::new(ExecutionMode::Scalar).unwrap();
        assert_eq!(ctx.threads(), 1);
        assert_eq!(ctx.install(|| rayon::current_num_threads()), 1);
    }

    #[test]
    fn explicit_thread_count_is_honoured() {
        let ctx = ExecutionContext::new(ExecutionMode::Parallel { threads: 3 }).unwrap();
        assert_eq!(ctx.threads(), 3);
        assert_eq!(ctx.mode(), ExecutionMode::Parallel { threads: 3 });
    }

    #[test]
    fn film_size_is_checked() {
        let mut image = FloatImage::new(4, 2);
        assert!(image.check_size().is_ok());
        image.pixels.pop();
        assert!(matches!(
            image.check_size(),
            Err(RenderError::FilmMismatch { width: 4, height: 2, got: 7 })
        ));
    }

    #[test]
    fn execution_mode_reads_from_yaml() {
        let mode: ExecutionMode = serde_yaml::from_str("mode: parallel\nthreads: 2\n").unwrap();
        assert_eq!(mode, ExecutionMode::Parallel { threads: 2 });
        let mode: ExecutionMode = serde_yaml::from_str("mode: scalar\n").unwrap();
        assert_eq!(mode, ExecutionMode::Scalar);
    }
}
