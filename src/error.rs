//! Error kinds of the panorama core. All of them are recoverable: the view
//! keeps running with the previous (or no) texture and with no hit detected.

use std::path::PathBuf;

use thiserror::Error;

/// Rejected sphere parameters.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("invalid mesh parameters: stacks={stacks} (min 1), slices={slices} (min 2), radius={radius} (must be > 0)")]
pub struct InvalidMeshParameters {
    pub stacks: u32,
    pub slices: u32,
    pub radius: f32,
}

/// Errors that can occur while swapping the panorama texture.
#[derive(Error, Debug)]
pub enum TextureLoadError {
    #[error("texture not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decoding error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no pixels ({0}x{1})")]
    EmptyImage(u32, u32),
}

/// The projection × view product cannot be inverted, or a direction lands on
/// the camera plane.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("projection-view matrix is singular")]
pub struct SingularMatrixError;

/// Errors that can occur while loading a [`crate::ViewerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum PanoramaError {
    #[error(transparent)]
    Mesh(#[from] InvalidMeshParameters),
    #[error(transparent)]
    Texture(#[from] TextureLoadError),
    #[error(transparent)]
    Singular(#[from] SingularMatrixError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
