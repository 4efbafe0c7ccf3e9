//! Order lifecycle: creation, payment reconciliation and status changes.
//!
//! Side effects (subscriber enrollment, notifications) run after the store
//! mutation has committed and can never fail the operation that caused them.

use std::sync::Arc;

use palmport_core::{
    Channel, CommerceError, Order, OrderDraft, OrderId, OrderNumber, OrderWithUser, StatusUpdate,
    TransitionPolicy, UserId,
};
use palmport_store::{OrderPage, Store, StoreError};

use crate::mail::Notifier;
use crate::paystack::{PaymentError, PaymentGateway};
use crate::subscribers::SubscriberRegistry;

/// How many order numbers to try before giving up on an insert.
pub const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Errors from lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Input or transition rejected by a domain rule.
    #[error(transparent)]
    Rejected(#[from] CommerceError),

    /// No order matches the id or reference.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// The gateway reported a non-successful transaction.
    #[error("payment not confirmed: {status}")]
    PaymentNotConfirmed {
        /// Gateway transaction status.
        status: String,
    },

    /// The gateway could not be reached or refused the call.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Persistence failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity: "order", id } => Self::OrderNotFound(id),
            StoreError::Rejected(rejection) => Self::Rejected(rejection),
            other => Self::Store(other),
        }
    }
}

/// Result of a successful payment verification.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// The paid order.
    pub order: Order,
    /// Transaction object as the gateway returned it.
    pub transaction: serde_json::Value,
    /// `false` when the order had already been marked paid.
    pub newly_paid: bool,
}

/// Coordinates order persistence with the gateway and notifications.
#[derive(Clone)]
pub struct OrderLifecycle {
    store: Arc<dyn Store>,
    payments: Option<Arc<dyn PaymentGateway>>,
    notifier: Notifier,
    subscribers: SubscriberRegistry,
    policy: TransitionPolicy,
    next_number: fn(Channel) -> OrderNumber,
}

impl OrderLifecycle {
    /// Create a lifecycle over the given dependencies.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        payments: Option<Arc<dyn PaymentGateway>>,
        notifier: Notifier,
        subscribers: SubscriberRegistry,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            store,
            payments,
            notifier,
            subscribers,
            policy,
            next_number: OrderNumber::generate,
        }
    }

    /// Validate and persist a new order, then dispatch its side effects.
    ///
    /// Order number collisions are retried with a fresh number.
    pub async fn create(&self, draft: OrderDraft) -> Result<Order, LifecycleError> {
        draft.validate()?;

        let mut attempt = 1;
        let order = loop {
            let number = (self.next_number)(draft.channel);
            match self.store.insert_order(draft.to_new_order(number)).await {
                Ok(order) => break order,
                Err(StoreError::Conflict { key, .. }) if attempt < MAX_ORDER_NUMBER_ATTEMPTS => {
                    tracing::warn!(
                        order_number = %key,
                        attempt,
                        "Order number collision, regenerating"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            order_number = %order.order_number,
            channel = %order.order_type,
            user_id = %order.user_id,
            total = order.amounts.total,
            "Order created"
        );

        let notifier = self.notifier.clone();
        let subscribers = self.subscribers.clone();
        let created = order.clone();
        tokio::spawn(async move {
            subscribers.auto_enroll(&created.customer.email).await;
            notifier.admin_new_order(&created).await;
        });

        Ok(order)
    }

    /// Confirm a payment with the gateway and settle the matching order.
    ///
    /// Marking the order paid and clearing the payer's cart happen in one
    /// store transaction. Re-verifying a paid order is a no-op that succeeds.
    pub async fn verify_payment(
        &self,
        reference: &str,
        user_id: &UserId,
    ) -> Result<VerifiedPayment, LifecycleError> {
        let gateway = self.payments.as_ref().ok_or(PaymentError::NotConfigured)?;
        let transaction = gateway.verify_transaction(reference).await?;

        if !transaction.is_success() {
            tracing::info!(
                reference = %reference,
                status = %transaction.status,
                "Payment not successful"
            );
            return Err(LifecycleError::PaymentNotConfirmed {
                status: transaction.status,
            });
        }

        let confirmation = self
            .store
            .confirm_payment_and_clear_cart(reference, user_id, self.policy)
            .await?;

        if confirmation.newly_paid {
            tracing::info!(
                order_number = %confirmation.order.order_number,
                user_id = %user_id,
                "Payment confirmed"
            );
            self.notifier
                .admin_payment_received(&confirmation.order)
                .await;
        } else {
            tracing::debug!(reference = %reference, "Order already paid");
        }

        Ok(VerifiedPayment {
            order: confirmation.order,
            transaction: transaction.raw,
            newly_paid: confirmation.newly_paid,
        })
    }

    /// Apply an admin status change. Absent values keep their stored status.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        delivery_status: Option<&str>,
        payment_status: Option<&str>,
    ) -> Result<Order, LifecycleError> {
        let update = StatusUpdate::parse(delivery_status, payment_status)?;
        let change = self
            .store
            .update_order_status(order_id, &update, self.policy)
            .await?;

        tracing::info!(
            order_number = %change.order.order_number,
            delivery_status = %change.order.delivery_status,
            payment_status = %change.order.payment_status,
            "Order status updated"
        );

        if let Some((from, to)) = change.delivery_transition() {
            let notifier = self.notifier.clone();
            let order = change.order.clone();
            tokio::spawn(async move {
                notifier.order_status_changed(&order, from, to).await;
            });
        }

        Ok(change.order)
    }

    /// A user's orders, newest first.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, LifecycleError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Every order with its account, newest first.
    pub async fn list_all(&self) -> Result<Vec<OrderWithUser>, LifecycleError> {
        Ok(self.store.list_orders_with_users().await?)
    }

    /// One page of orders, 1-based.
    pub async fn list_page(&self, page: u32, limit: u32) -> Result<OrderPage, LifecycleError> {
        let page = page.max(1);
        let offset = (page - 1).saturating_mul(limit);
        Ok(self.store.list_orders_page(limit, offset).await?)
    }

    #[cfg(test)]
    fn with_number_source(mut self, next_number: fn(Channel) -> OrderNumber) -> Self {
        self.next_number = next_number;
        self
    }
}

impl std::fmt::Debug for OrderLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLifecycle")
            .field("policy", &self.policy)
            .field("payments", &self.payments.is_some())
            .finish_non_exhaustive()
    }
}
