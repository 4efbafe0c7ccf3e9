//! Outbound email.
//!
//! Mail is always best effort: callers go through [`Notifier`], which logs
//! delivery failures instead of returning them.

mod notifier;
pub mod templates;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

pub use notifier::Notifier;

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Error type for mail delivery.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay refused the message.
    #[error("mail relay rejected message ({status}): {message}")]
    Relay {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Something that can deliver email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError>;
}

/// JSON body accepted by the mail relay.
#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Delivers mail by POSTing JSON to an HTTP relay.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    /// Create a relay mailer.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Configuration` if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
    ) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MailError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key,
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        let body = RelayMessage {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = %email.to, subject = %email.subject, "Email relayed");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(MailError::Relay {
            status: status.as_u16(),
            message,
        })
    }
}

/// Logs messages instead of sending them. Used when no relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Mail relay not configured, dropping email"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn email() -> OutboundEmail {
        OutboundEmail {
            to: "ada@example.com".into(),
            subject: "Hello".into(),
            html: "<p>Hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn relays_json_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer relay-key"))
            .and(body_json(json!({
                "from": "PalmPort <no-reply@palmport.ng>",
                "to": "ada@example.com",
                "subject": "Hello",
                "html": "<p>Hi</p>"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(
            format!("{}/send", server.uri()),
            Some("relay-key".into()),
            "PalmPort <no-reply@palmport.ng>",
        )
        .unwrap();

        mailer.send(email()).await.unwrap();
    }

    #[tokio::test]
    async fn relay_rejection_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(server.uri(), None, "noreply@palmport.ng").unwrap();
        let err = mailer.send(email()).await.unwrap_err();
        assert!(matches!(err, MailError::Relay { status: 503, .. }));
    }
}
