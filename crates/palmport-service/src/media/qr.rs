//! QR codes rendered by an HTTP QR service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{png_data_url, MediaError, QrEncoder};

/// Edge length of generated codes, in pixels.
const QR_SIZE: &str = "300x300";

/// Renders QR codes through a `create-qr-code` style HTTP API.
#[derive(Debug, Clone)]
pub struct HttpQrEncoder {
    client: Client,
    url: String,
}

impl HttpQrEncoder {
    /// Create an encoder for the given service URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Configuration` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MediaError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl QrEncoder for HttpQrEncoder {
    async fn encode_data_url(&self, content: &str) -> Result<String, MediaError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("data", content),
                ("size", QR_SIZE),
                ("ecc", "H"),
                ("format", "png"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Api {
                service: "qr",
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(MediaError::Api {
                service: "qr",
                status: status.as_u16(),
                message: "empty image".into(),
            });
        }

        Ok(png_data_url(&bytes))
    }
}
