use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tile map: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid tile map: {0}")]
    InvalidMap(String),

    #[error("layer `{layer}`: {reason}")]
    InvalidLayer { layer: String, reason: String },

    /// A cell references a gid past the end of the loaded tile images.
    #[error("layer `{layer}` uses tile {gid} but only {available} tile images were loaded")]
    MissingTile {
        layer: String,
        gid: u32,
        available: usize,
    },

    #[error("invalid font data: {0}")]
    Font(#[from] ab_glyph::InvalidFont),

    #[error("no animation named `{0}`")]
    UnknownAnimation(String),

    #[error("an entity with id `{0}` already exists")]
    DuplicateEntity(String),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable graphics adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to open graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface does not support {0}")]
    UnsupportedSurface(&'static str),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        EngineError::Image {
            path: path.into(),
            source,
        }
    }
}
