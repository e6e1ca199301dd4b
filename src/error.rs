//! Error taxonomy shared by every stage of dataset generation.

use std::fmt;
use std::path::PathBuf;

use crate::driver::ImageRole;
use crate::renderer::RenderError;

/// Which kind of asset a lookup was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Object,
    Material,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Object => write!(f, "object"),
            AssetKind::Material => write!(f, "material"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad counts, sizes, angles or names. Raised before any render call.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unsupported pattern `{0}` (expected hemisphere, circle or grid)")]
    UnsupportedPattern(String),

    #[error("{kind} `{name}` not found")]
    AssetNotFound { kind: AssetKind, name: String },

    #[error("failed to load {}: {reason}", .path.display())]
    AssetLoad { path: PathBuf, reason: String },

    #[error("render failed for {role}: {source}")]
    RenderFailure {
        role: ImageRole,
        #[source]
        source: RenderError,
    },

    #[error("cancelled after {completed} images")]
    Cancelled { completed: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn invalid<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }

    pub fn not_found(kind: AssetKind, name: impl Into<String>) -> Self {
        Error::AssetNotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn asset_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::AssetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors a caller can fix by changing arguments; these never leave
    /// anything on disk.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidParameter(_) | Error::UnsupportedPattern(_) | Error::AssetNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
