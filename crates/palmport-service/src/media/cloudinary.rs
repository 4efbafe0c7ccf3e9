//! Cloudinary signed uploads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{image_data_url, ImageHost, MediaError};
use crate::crypto::sha256_hex;

/// Folder every upload lands in.
pub const UPLOAD_FOLDER: &str = "palmport_batches";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Cloudinary upload API client.
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    client: Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Configuration` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        cloud_name: &str,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MediaError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            upload_url: format!("{}/{cloud_name}/image/upload", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }

    /// Signature over the signed parameters, sorted by name.
    fn sign(&self, folder: &str, timestamp: i64) -> String {
        sha256_hex(&format!(
            "folder={folder}&timestamp={timestamp}{}",
            self.api_secret
        ))
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, image_base64: &str) -> Result<String, MediaError> {
        let file = image_data_url(image_base64)?;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self.sign(UPLOAD_FOLDER, timestamp);

        let params = [
            ("file", file),
            ("api_key", self.api_key.clone()),
            ("timestamp", timestamp.to_string()),
            ("folder", UPLOAD_FOLDER.to_string()),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response = self
            .client
            .post(&self.upload_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: UploadResponse = response.json().await?;
            tracing::debug!(url = %body.secure_url, "Image uploaded");
            return Ok(body.secure_url);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("HTTP {status}"),
        };
        Err(MediaError::Api {
            service: "cloudinary",
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn signature_is_sha256_of_sorted_params_and_secret() {
        let client = CloudinaryClient::new("http://localhost", "demo", "key", "secret").unwrap();
        assert_eq!(
            client.sign("palmport_batches", 1_700_000_000),
            sha256_hex("folder=palmport_batches&timestamp=1700000000secret")
        );
    }

    #[tokio::test]
    async fn upload_returns_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .and(body_string_contains("folder=palmport_batches"))
            .and(body_string_contains("signature_algorithm=sha256"))
            .and(body_string_contains("api_key=key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/palmport_batches/abc.png"
            })))
            .mount(&server)
            .await;

        let client = CloudinaryClient::new(&server.uri(), "demo", "key", "secret").unwrap();
        let url = client.upload("iVBORw==").await.unwrap();
        assert!(url.ends_with("palmport_batches/abc.png"));
    }

    #[tokio::test]
    async fn upload_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid Signature" }
            })))
            .mount(&server)
            .await;

        let client = CloudinaryClient::new(&server.uri(), "demo", "key", "secret").unwrap();
        match client.upload("iVBORw==").await.unwrap_err() {
            MediaError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn invalid_image_never_reaches_the_network() {
        let client = CloudinaryClient::new("http://127.0.0.1:9", "demo", "key", "secret").unwrap();
        assert!(matches!(
            client.upload("%%%").await,
            Err(MediaError::InvalidImage(_))
        ));
    }
}
