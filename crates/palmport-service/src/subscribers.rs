//! Mailing list enrollment and broadcasts.

use std::sync::Arc;

use palmport_core::{is_plausible_email, CommerceError, Subscriber, SubscriberId};
use palmport_store::Store;

use crate::lifecycle::LifecycleError;
use crate::mail::Notifier;

/// Outcome of a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// The address was enrolled by this request.
    Subscribed(Subscriber),
    /// The address was already on the list.
    AlreadySubscribed,
}

/// Counts from a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers targeted.
    pub recipients: usize,
    /// Messages the mailer accepted.
    pub sent: usize,
}

/// The subscriber list and the mail it triggers.
#[derive(Clone)]
pub struct SubscriberRegistry {
    store: Arc<dyn Store>,
    notifier: Notifier,
}

impl SubscriberRegistry {
    /// Create a registry.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Enroll an address from the public sign-up form.
    ///
    /// A first-time subscriber gets a confirmation email and the admin an alert,
    /// both sent in the background.
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, LifecycleError> {
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(CommerceError::Validation("Invalid email address".into()).into());
        }

        let Some(subscriber) = self.store.insert_subscriber(email).await? else {
            return Ok(SubscribeOutcome::AlreadySubscribed);
        };

        tracing::info!(email = %subscriber.email, "New subscriber");

        let notifier = self.notifier.clone();
        let address = subscriber.email.clone();
        tokio::spawn(async move {
            notifier.subscription_confirmed(&address).await;
            notifier.admin_new_subscriber(&address).await;
        });

        Ok(SubscribeOutcome::Subscribed(subscriber))
    }

    /// Enroll a checkout email, welcoming it if new. Never fails.
    pub async fn auto_enroll(&self, email: &str) {
        let email = email.trim();
        if !is_plausible_email(email) {
            return;
        }

        match self.store.insert_subscriber(email).await {
            Ok(Some(subscriber)) => {
                tracing::info!(email = %subscriber.email, "Customer enrolled as subscriber");
                self.notifier.welcome_subscriber(&subscriber.email).await;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(email = %email, error = %e, "Failed to enroll subscriber"),
        }
    }

    /// Every subscriber, newest first.
    pub async fn list(&self) -> Result<Vec<Subscriber>, LifecycleError> {
        Ok(self.store.list_subscribers().await?)
    }

    /// Remove one subscriber.
    pub async fn delete(&self, id: &SubscriberId) -> Result<(), LifecycleError> {
        Ok(self.store.delete_subscriber(id).await?)
    }

    /// Email every subscriber.
    pub async fn broadcast(
        &self,
        subject: &str,
        message: &str,
    ) -> Result<BroadcastReport, LifecycleError> {
        if subject.trim().is_empty() || message.trim().is_empty() {
            return Err(
                CommerceError::Validation("Subject and message are required".into()).into(),
            );
        }

        let subscribers = self.store.list_subscribers().await?;
        if subscribers.is_empty() {
            return Err(CommerceError::Validation("No subscribers to email.".into()).into());
        }

        let sent = self
            .notifier
            .broadcast(subscribers.iter().map(|s| s.email.as_str()), subject, message)
            .await;

        tracing::info!(recipients = subscribers.len(), sent, "Broadcast sent");
        Ok(BroadcastReport {
            recipients: subscribers.len(),
            sent,
        })
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palmport_store::MemoryStore;

    use crate::mail::{LogMailer, Mailer};

    fn registry() -> SubscriberRegistry {
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
        SubscriberRegistry::new(
            Arc::new(MemoryStore::new()),
            Notifier::new(mailer, None, "http://localhost:3000".into()),
        )
    }

    #[tokio::test]
    async fn subscribe_is_insert_once() {
        let registry = registry();
        assert!(matches!(
            registry.subscribe(" ada@example.com ").await.unwrap(),
            SubscribeOutcome::Subscribed(ref s) if s.email == "ada@example.com"
        ));
        assert_eq!(
            registry.subscribe("ada@example.com").await.unwrap(),
            SubscribeOutcome::AlreadySubscribed
        );
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_implausible_addresses() {
        let registry = registry();
        assert!(matches!(
            registry.subscribe("not-an-email").await,
            Err(LifecycleError::Rejected(CommerceError::Validation(ref m)))
                if m == "Invalid email address"
        ));

        registry.auto_enroll("also-not-an-email").await;
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_needs_content_and_recipients() {
        let registry = registry();
        assert!(registry.broadcast("", "body").await.is_err());
        assert!(matches!(
            registry.broadcast("News", "body").await,
            Err(LifecycleError::Rejected(CommerceError::Validation(ref m)))
                if m == "No subscribers to email."
        ));

        registry.auto_enroll("ada@example.com").await;
        registry.auto_enroll("obi@example.com").await;
        let report = registry.broadcast("News", "<p>Fresh batch</p>").await.unwrap();
        assert_eq!(report, BroadcastReport { recipients: 2, sent: 2 });
    }
}
