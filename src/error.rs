//! Error types for the watermark-inpaint crate.

/// Boxed error produced by an inpainting backend.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while repairing an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The inpainting model failed. The underlying cause is carried verbatim.
    #[error("inpainting model failed: {0}")]
    Inference(#[source] BoxedError),

    /// The inpainting model returned a tensor of unexpected shape.
    #[error("model output shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Shape the adapter required.
        expected: String,
        /// Shape the model produced.
        actual: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration value for {name}: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The box list could not be parsed as JSON.
    #[error("failed to parse boxes: {0}")]
    BoxParse(#[source] serde_json::Error),

    /// A configuration file could not be parsed as JSON.
    #[error("failed to parse configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Wrap any backend error as an [`Error::Inference`].
    pub fn inference<E>(err: E) -> Self
    where
        E: Into<BoxedError>,
    {
        Self::Inference(err.into())
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
