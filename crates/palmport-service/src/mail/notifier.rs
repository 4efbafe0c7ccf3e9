//! Best-effort notification dispatch.

use std::sync::Arc;

use futures::future::join_all;

use palmport_core::{DeliveryStatus, Order};

use super::{templates, Mailer, OutboundEmail};

/// Renders and sends the service's notifications.
///
/// No method here fails: delivery errors are logged and dropped so a mail
/// outage never affects an order.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    admin_email: Option<String>,
    app_base_url: String,
}

impl Notifier {
    /// Create a notifier.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, admin_email: Option<String>, app_base_url: String) -> Self {
        Self {
            mailer,
            admin_email,
            app_base_url,
        }
    }

    /// Send one message, logging any failure. Returns whether it was accepted.
    pub async fn deliver(&self, email: OutboundEmail) -> bool {
        let to = email.to.clone();
        let subject = email.subject.clone();
        match self.mailer.send(email).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(to = %to, subject = %subject, error = %e, "Failed to send email");
                false
            }
        }
    }

    fn admin(&self) -> Option<&str> {
        let admin = self.admin_email.as_deref();
        if admin.is_none() {
            tracing::debug!("ADMIN_EMAIL not set, skipping admin notification");
        }
        admin
    }

    /// Alert the admin about a new order.
    pub async fn admin_new_order(&self, order: &Order) {
        if let Some(admin) = self.admin() {
            self.deliver(templates::admin_new_order(admin, order, &self.app_base_url)).await;
        }
    }

    /// Alert the admin about a confirmed payment.
    pub async fn admin_payment_received(&self, order: &Order) {
        if let Some(admin) = self.admin() {
            self.deliver(templates::admin_payment_received(admin, order, &self.app_base_url)).await;
        }
    }

    /// Alert the admin about a new subscriber.
    pub async fn admin_new_subscriber(&self, subscriber: &str) {
        if let Some(admin) = self.admin() {
            self.deliver(templates::admin_new_subscriber(admin, subscriber)).await;
        }
    }

    /// Tell the customer their delivery status changed.
    pub async fn order_status_changed(
        &self,
        order: &Order,
        from: DeliveryStatus,
        to: DeliveryStatus,
    ) {
        if !palmport_core::is_plausible_email(&order.customer.email) {
            tracing::debug!(
                order_number = %order.order_number,
                "Order has no usable email, skipping status update"
            );
            return;
        }
        self.deliver(templates::order_status_update(order, from, to)).await;
    }

    /// Welcome a customer auto-enrolled at checkout.
    pub async fn welcome_subscriber(&self, email: &str) {
        self.deliver(templates::welcome_subscriber(email)).await;
    }

    /// Confirm a newsletter sign-up.
    pub async fn subscription_confirmed(&self, email: &str) {
        self.deliver(templates::subscription_confirmation(email)).await;
    }

    /// Send a broadcast to every recipient concurrently.
    ///
    /// Returns how many messages the mailer accepted.
    pub async fn broadcast<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a str>,
        subject: &str,
        message: &str,
    ) -> usize {
        let sends = recipients
            .into_iter()
            .map(|to| self.deliver(templates::mass_mail(to, subject, message)));
        join_all(sends).await.into_iter().filter(|sent| *sent).count()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("admin_email", &self.admin_email)
            .field("app_base_url", &self.app_base_url)
            .finish_non_exhaustive()
    }
}
