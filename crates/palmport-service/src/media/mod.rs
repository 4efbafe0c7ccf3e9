//! Image hosting and QR rendering.

pub mod cloudinary;
pub mod qr;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

pub use cloudinary::CloudinaryClient;
pub use qr::HttpQrEncoder;

/// Error type for media operations.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service returned an error.
    #[error("{service} error ({status}): {message}")]
    Api {
        /// Which service failed.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The submitted image is not valid base64.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// No image host is configured for this deployment.
    #[error("image hosting is not configured")]
    NotConfigured,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Hosts uploaded images and returns their public URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a base64 image (raw or as a data URL).
    async fn upload(&self, image_base64: &str) -> Result<String, MediaError>;
}

/// Renders text as a QR code image.
#[async_trait]
pub trait QrEncoder: Send + Sync {
    /// Encode `content` and return a `data:image/png;base64,...` URL.
    async fn encode_data_url(&self, content: &str) -> Result<String, MediaError>;
}

/// Normalise an uploaded image into a data URL, checking the payload decodes.
///
/// # Errors
///
/// Returns `MediaError::InvalidImage` if the payload is empty or not base64.
pub fn image_data_url(input: &str) -> Result<String, MediaError> {
    let input = input.trim();
    let (prefix, payload) = match input.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => {
            if !header.ends_with(";base64") {
                return Err(MediaError::InvalidImage("data URL is not base64".into()));
            }
            (header.to_string(), payload)
        }
        _ => ("data:image/png;base64".to_string(), input),
    };

    if payload.is_empty() {
        return Err(MediaError::InvalidImage("empty image".into()));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| MediaError::InvalidImage(e.to_string()))?;

    Ok(format!("{prefix},{payload}"))
}

/// Wrap PNG bytes in a data URL.
#[must_use]
pub fn png_data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}
