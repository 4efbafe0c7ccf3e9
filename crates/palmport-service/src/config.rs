//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use palmport_core::TransitionPolicy;

/// Default Paystack API base URL.
pub const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Default Cloudinary upload API base URL.
pub const CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Default QR rendering service.
pub const QR_API_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Signing secret used when `JWT_SECRET` is unset. Development only.
const DEV_JWT_SECRET: &str = "palmport-dev-secret";

/// Default request body limit: 10 MiB, enough for base64 product images.
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:4000").
    pub listen_addr: String,

    /// PostgreSQL connection URL. Without it the service keeps data in memory.
    pub database_url: Option<String>,

    /// HS256 signing secret for issued tokens.
    pub jwt_secret: String,

    /// Admin login email, provisioned at startup and used for notifications.
    pub admin_email: Option<String>,

    /// Admin password, hashed at startup when the admin account is created.
    pub admin_password: Option<String>,

    /// Public base URL of this deployment (payment callback, dashboard links).
    pub app_base_url: String,

    /// Storefront URL, used to build batch trace links.
    pub client_url: String,

    /// Paystack secret key (optional).
    pub paystack_secret_key: Option<String>,

    /// Paystack API base URL.
    pub paystack_base_url: String,

    /// Mail relay endpoint (optional; mail is only logged without it).
    pub mail_relay_url: Option<String>,

    /// Bearer key for the mail relay.
    pub mail_relay_key: Option<String>,

    /// Sender address for outgoing mail.
    pub email_from: String,

    /// Cloudinary cloud name (optional).
    pub cloudinary_cloud_name: Option<String>,

    /// Cloudinary API key (optional).
    pub cloudinary_api_key: Option<String>,

    /// Cloudinary API secret (optional).
    pub cloudinary_api_secret: Option<String>,

    /// Cloudinary upload API base URL.
    pub cloudinary_base_url: String,

    /// QR rendering service URL.
    pub qr_api_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Treat delivered/cancelled/refunded as final.
    pub strict_status_transitions: bool,
}

/// Paystack secrets file structure.
#[derive(Debug, Deserialize)]
struct PaystackSecrets {
    secret_key: String,
    #[serde(default)]
    base_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (paystack_secret_key, paystack_base_url) = load_paystack_secrets();

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set - using the development signing secret");
            DEV_JWT_SECRET.into()
        });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            jwt_secret,
            admin_email: std::env::var("ADMIN_EMAIL").ok(),
            admin_password: std::env::var("ADMIN_PASSWORD").ok(),
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            paystack_secret_key,
            paystack_base_url,
            mail_relay_url: std::env::var("MAIL_RELAY_URL").ok(),
            mail_relay_key: std::env::var("MAIL_RELAY_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "PalmPort <no-reply@palmport.ng>".into()),
            cloudinary_cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME").ok(),
            cloudinary_api_key: std::env::var("CLOUDINARY_API_KEY").ok(),
            cloudinary_api_secret: std::env::var("CLOUDINARY_API_SECRET").ok(),
            cloudinary_base_url: std::env::var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|_| CLOUDINARY_BASE_URL.into()),
            qr_api_url: std::env::var("QR_API_URL").unwrap_or_else(|_| QR_API_URL.into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            strict_status_transitions: std::env::var("STRICT_STATUS_TRANSITIONS")
                .is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes")),
        }
    }

    /// The status transition policy selected by configuration.
    #[must_use]
    pub const fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_status_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }
}

/// Load Paystack secrets from file or environment.
fn load_paystack_secrets() -> (Option<String>, String) {
    let secret_paths = [".secrets/paystack.json", "../.secrets/paystack.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<PaystackSecrets>(path) {
            tracing::info!(path = %path, "Loaded Paystack secrets from file");
            return (
                Some(secrets.secret_key),
                secrets
                    .base_url
                    .unwrap_or_else(|| PAYSTACK_BASE_URL.into()),
            );
        }
    }

    tracing::debug!("Paystack secrets file not found, using environment variables");
    (
        std::env::var("PAYSTACK_SECRET_KEY").ok(),
        std::env::var("PAYSTACK_BASE_URL").unwrap_or_else(|_| PAYSTACK_BASE_URL.into()),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4000".into(),
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.into(),
            admin_email: None,
            admin_password: None,
            app_base_url: "http://localhost:3000".into(),
            client_url: "http://localhost:3000".into(),
            paystack_secret_key: None,
            paystack_base_url: PAYSTACK_BASE_URL.into(),
            mail_relay_url: None,
            mail_relay_key: None,
            email_from: "PalmPort <no-reply@palmport.ng>".into(),
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_base_url: CLOUDINARY_BASE_URL.into(),
            qr_api_url: QR_API_URL.into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            request_timeout_seconds: 30,
            strict_status_transitions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_permissive() {
        let config = ServiceConfig::default();
        assert_eq!(config.transition_policy(), TransitionPolicy::Permissive);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);

        let strict = ServiceConfig {
            strict_status_transitions: true,
            ..ServiceConfig::default()
        };
        assert_eq!(strict.transition_policy(), TransitionPolicy::Strict);
    }
}
