//! Application state.

use std::sync::Arc;

use palmport_store::Store;

use crate::auth::TokenKeys;
use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::lifecycle::OrderLifecycle;
use crate::mail::{HttpMailer, LogMailer, Mailer, Notifier};
use crate::media::{CloudinaryClient, HttpQrEncoder, ImageHost, MediaError, QrEncoder};
use crate::paystack::{PaymentError, PaymentGateway, PaystackClient};
use crate::subscribers::SubscriberRegistry;

/// Outbound integrations, built from configuration or injected by tests.
#[derive(Clone)]
pub struct Integrations {
    /// Payment gateway (optional).
    pub payments: Option<Arc<dyn PaymentGateway>>,
    /// Mail delivery.
    pub mailer: Arc<dyn Mailer>,
    /// Image hosting (optional).
    pub images: Option<Arc<dyn ImageHost>>,
    /// QR rendering (optional).
    pub qr: Option<Arc<dyn QrEncoder>>,
}

impl Integrations {
    /// Build every client the configuration enables.
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        let callback_url = format!("{}/payment/verify", config.app_base_url.trim_end_matches('/'));
        let payments = config.paystack_secret_key.as_ref().and_then(|key| {
            match PaystackClient::new(&config.paystack_base_url, key, &callback_url) {
                Ok(client) => {
                    tracing::info!(
                        base_url = %config.paystack_base_url,
                        "Paystack integration enabled"
                    );
                    Some(Arc::new(client) as Arc<dyn PaymentGateway>)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build Paystack client");
                    None
                }
            }
        });

        if payments.is_none() {
            tracing::warn!("Paystack not configured - payments will not be available");
        }

        let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
            Some(url) => {
                match HttpMailer::new(url, config.mail_relay_key.clone(), &config.email_from) {
                    Ok(mailer) => {
                        tracing::info!(relay = %url, "Mail relay enabled");
                        Arc::new(mailer)
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Failed to build mail relay client, logging mail instead"
                        );
                        Arc::new(LogMailer)
                    }
                }
            }
            None => {
                tracing::warn!("Mail relay not configured - emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        let images = match (
            &config.cloudinary_cloud_name,
            &config.cloudinary_api_key,
            &config.cloudinary_api_secret,
        ) {
            (Some(cloud), Some(key), Some(secret)) => {
                match CloudinaryClient::new(&config.cloudinary_base_url, cloud, key, secret) {
                    Ok(client) => {
                        tracing::info!(cloud = %cloud, "Cloudinary integration enabled");
                        Some(Arc::new(client) as Arc<dyn ImageHost>)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build Cloudinary client");
                        None
                    }
                }
            }
            _ => None,
        };

        if images.is_none() {
            tracing::warn!("Cloudinary not configured - image uploads will be rejected");
        }

        let qr = match HttpQrEncoder::new(&config.qr_api_url) {
            Ok(encoder) => Some(Arc::new(encoder) as Arc<dyn QrEncoder>),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to build QR client - batches cannot be created"
                );
                None
            }
        };

        Self {
            payments,
            mailer,
            images,
            qr,
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Session token keys.
    pub tokens: TokenKeys,

    /// Payment gateway (optional).
    pub payments: Option<Arc<dyn PaymentGateway>>,

    /// Image hosting (optional).
    pub images: Option<Arc<dyn ImageHost>>,

    /// QR rendering (optional).
    pub qr: Option<Arc<dyn QrEncoder>>,

    /// Notification dispatch.
    pub notifier: Notifier,

    /// Mailing list.
    pub subscribers: SubscriberRegistry,

    /// Order lifecycle.
    pub orders: OrderLifecycle,
}

impl AppState {
    /// Create application state with clients built from configuration.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let integrations = Integrations::from_config(&config);
        Self::with_integrations(store, config, integrations)
    }

    /// Create application state around explicit integrations.
    #[must_use]
    pub fn with_integrations(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        integrations: Integrations,
    ) -> Self {
        let notifier = Notifier::new(
            integrations.mailer,
            config.admin_email.clone(),
            config.app_base_url.clone(),
        );
        let subscribers = SubscriberRegistry::new(store.clone(), notifier.clone());
        let orders = OrderLifecycle::new(
            store.clone(),
            integrations.payments.clone(),
            notifier.clone(),
            subscribers.clone(),
            config.transition_policy(),
        );

        Self {
            tokens: TokenKeys::from_secret(&config.jwt_secret),
            store,
            config,
            payments: integrations.payments,
            images: integrations.images,
            qr: integrations.qr,
            notifier,
            subscribers,
            orders,
        }
    }

    /// The payment gateway, or an upstream error when none is configured.
    pub fn payment_gateway(&self) -> Result<&dyn PaymentGateway, ApiError> {
        self.payments
            .as_deref()
            .ok_or_else(|| PaymentError::NotConfigured.into())
    }

    /// Upload an image if one was submitted.
    pub async fn upload_image(
        &self,
        image_base64: Option<&str>,
    ) -> Result<Option<String>, ApiError> {
        let Some(image) = image_base64.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let host = self.images.as_deref().ok_or(MediaError::NotConfigured)?;
        Ok(Some(host.upload(image).await?))
    }

    /// Render a QR code data URL.
    pub async fn qr_data_url(&self, content: &str) -> Result<String, ApiError> {
        let encoder = self.qr.as_deref().ok_or_else(|| {
            ApiError::upstream("QR code generation failed", MediaError::NotConfigured)
        })?;
        encoder
            .encode_data_url(content)
            .await
            .map_err(|e| ApiError::upstream("QR code generation failed", e))
    }

    /// Check if Paystack is configured.
    #[must_use]
    pub fn has_payments(&self) -> bool {
        self.payments.is_some()
    }
}
