//! Error types for the customizer core.
//!
//! GPU and asset plumbing returns `anyhow::Result`; everything that crosses the
//! boundary of the customization view is mapped onto [`StudioError`] so callers
//! can decide between alerting the user and logging.

use thiserror::Error;

use crate::design::Side;

/// Result type for customizer operations.
pub type Result<T> = std::result::Result<T, StudioError>;

/// Errors that can surface from the customization view.
#[derive(Debug, Error)]
pub enum StudioError {
    /// An upload was requested without a selected file.
    #[error("please select an image file")]
    MissingImage,

    /// The uploaded file could not be decoded into a raster image.
    #[error("could not decode the image for the {side} side: {source}")]
    Decode {
        side: Side,
        #[source]
        source: image::ImageError,
    },

    /// No render surface or GPU device could be acquired.
    #[error("render surface unavailable: {0}")]
    RenderSurface(String),

    /// The garment mesh failed to load.
    #[error("asset load failed: {0}")]
    AssetLoad(String),

    /// Rendering or reading back a capture viewpoint failed.
    #[error("capture failed: {0}")]
    Capture(String),

    /// A captured frame could not be encoded.
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// A colour string was not a `#rrggbb` hex value.
    #[error("invalid colour: {0}")]
    InvalidColour(String),

    /// A required contact field was left empty.
    #[error("please fill in all fields (missing {0})")]
    IncompleteContact(&'static str),

    /// The order backend rejected or failed to store the order.
    #[error("order failed: {0}")]
    Order(String),

    /// The configuration file exists but is malformed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// Whether the error should be shown to the user instead of only logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            StudioError::MissingImage
                | StudioError::Decode { .. }
                | StudioError::InvalidColour(_)
                | StudioError::IncompleteContact(_)
                | StudioError::Order(_)
        )
    }
}
