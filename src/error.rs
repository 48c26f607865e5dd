use thiserror::Error;

/// Result type alias for panorama resolution operations.
pub type Result<T> = std::result::Result<T, PanoError>;

/// Errors that can occur when resolving or displaying panoramas.
#[derive(Error, Debug)]
pub enum PanoError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid response from the imagery service
    #[error("Invalid response from imagery service: {0}")]
    InvalidResponse(String),

    /// No panorama within the give-up radius
    #[error("Could not find panorama within {radius_meters}m")]
    PanoramaNotFound { radius_meters: f64 },

    /// Capture metadata did not have the expected shape
    #[error("Malformed capture metadata: {0}")]
    MalformedMetadata(String),

    /// The resolution attempt was superseded by a newer one
    #[error("Resolution attempt was superseded")]
    Cancelled,

    /// A camera operation was requested before any panorama was shown
    #[error("No panorama is displayed yet")]
    NoSurface,

    /// Uploaded image was not a base64 data URI
    #[error("Invalid image data URI")]
    InvalidDataUri,

    /// Upload fields would escape the output directory
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Base64 payload could not be decoded
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Image processing error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration value is missing or invalid
    #[error("Invalid value for {var}: {reason}")]
    InvalidConfig { var: String, reason: String },
}
