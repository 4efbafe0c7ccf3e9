//! Order types and the status machine.
//!
//! An order carries two independent status axes: `payment_status` (financial
//! settlement) and `delivery_status` (fulfilment). Both are mutated only
//! through [`Order::apply_status_update`] and [`Order::confirm_payment`], which
//! consult the active [`TransitionPolicy`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, Result};
use crate::ids::{OrderId, UserId};

// ============================================================================
// Constants
// ============================================================================

/// Order number prefix for self-service online orders.
pub const ONLINE_ORDER_PREFIX: &str = "PALM";

/// Order number prefix for assisted (WhatsApp/customer service) orders.
pub const ASSISTED_ORDER_PREFIX: &str = "WA";

/// Inclusive range of the random order number suffix (always five digits).
const ORDER_SUFFIX_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;

// ============================================================================
// Channel
// ============================================================================

/// The path through which an order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Self-service checkout paid through the payment gateway.
    Online,
    /// Manual checkout confirmed by contacting the customer.
    Assisted,
}

impl Channel {
    /// Prefix used in order numbers for this channel.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Online => ONLINE_ORDER_PREFIX,
            Self::Assisted => ASSISTED_ORDER_PREFIX,
        }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Assisted => "assisted",
        }
    }

    /// Human-readable label used in notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "Online Order",
            Self::Assisted => "WhatsApp Order",
        }
    }

    /// Delivery status a freshly created order starts in.
    #[must_use]
    pub const fn initial_delivery_status(self) -> DeliveryStatus {
        match self {
            Self::Online => DeliveryStatus::Pending,
            Self::Assisted => DeliveryStatus::AwaitingContact,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "online" => Ok(Self::Online),
            "assisted" => Ok(Self::Assisted),
            other => Err(CommerceError::Validation(format!("unknown order type: {other}"))),
        }
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Financial settlement state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No confirmed payment yet.
    Pending,
    /// Payment confirmed by the gateway (or recorded by an admin).
    Paid,
    /// Payment attempt failed.
    Failed,
    /// Payment returned to the customer.
    Refunded,
}

impl PaymentStatus {
    /// Every payment status, in declaration order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Paid, Self::Failed, Self::Refunded];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Whether the strict transition policy treats this status as final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CommerceError::InvalidStatus {
                kind: "payment",
                value: s.to_string(),
            })
    }
}

/// Fulfilment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Received, not yet being worked on.
    Pending,
    /// Being prepared for shipment.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Will not be fulfilled.
    Cancelled,
    /// Assisted order waiting for the customer to be contacted.
    AwaitingContact,
}

impl DeliveryStatus {
    /// Every delivery status, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::AwaitingContact,
    ];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::AwaitingContact => "awaiting_contact",
        }
    }

    /// Human-readable label shown to customers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::AwaitingContact => "Awaiting Contact",
        }
    }

    /// One-sentence explanation shown to customers.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "Your order has been received and is being processed.",
            Self::Processing => "We are currently preparing your order for shipment.",
            Self::Shipped => "Your order has been shipped and is on its way to you.",
            Self::Delivered => "Your order has been delivered successfully.",
            Self::Cancelled => "Your order has been cancelled.",
            Self::AwaitingContact => "We are awaiting contact to confirm your order details.",
        }
    }

    /// Whether the strict transition policy treats this status as final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CommerceError::InvalidStatus {
                kind: "delivery",
                value: s.to_string(),
            })
    }
}

/// Which status changes are allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may move to any other status.
    #[default]
    Permissive,
    /// `delivered`, `cancelled` and `refunded` are final. Re-asserting the
    /// same value is still accepted.
    Strict,
}

impl TransitionPolicy {
    /// Check a delivery status change.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidTransition` when the policy forbids it.
    pub fn check_delivery(self, from: DeliveryStatus, to: DeliveryStatus) -> Result<()> {
        if self == Self::Strict && from != to && from.is_terminal() {
            return Err(CommerceError::InvalidTransition {
                kind: "delivery",
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Check a payment status change.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidTransition` when the policy forbids it.
    pub fn check_payment(self, from: PaymentStatus, to: PaymentStatus) -> Result<()> {
        if self == Self::Strict && from != to && from.is_terminal() {
            return Err(CommerceError::InvalidTransition {
                kind: "payment",
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Order number
// ============================================================================

/// Public, human-readable order identifier: `<PREFIX>-<unixMillis>-<5 digits>`.
///
/// The same string is handed to the payment gateway as the transaction
/// reference, so verification looks orders up by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate a fresh order number for a channel from the current time.
    #[must_use]
    pub fn generate(channel: Channel) -> Self {
        let suffix = rand::thread_rng().gen_range(ORDER_SUFFIX_RANGE);
        Self::from_parts(channel, Utc::now().timestamp_millis(), suffix)
    }

    /// Build an order number from explicit parts.
    #[must_use]
    pub fn from_parts(channel: Channel, unix_millis: i64, suffix: u32) -> Self {
        Self(format!("{}-{unix_millis}-{suffix:05}", channel.prefix()))
    }

    /// Wrap a stored order number without validation.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// The channel encoded in the prefix, if recognisable.
    #[must_use]
    pub fn channel(&self) -> Option<Channel> {
        match self.0.split_once('-')?.0 {
            ONLINE_ORDER_PREFIX => Some(Channel::Online),
            ASSISTED_ORDER_PREFIX => Some(Channel::Assisted),
            _ => None,
        }
    }

    /// The order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Order contents
// ============================================================================

/// A single order line, stored verbatim as part of the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product name at the time of ordering.
    pub name: String,
    /// Pack size (e.g. "5L").
    #[serde(default)]
    pub size: String,
    /// Number of units.
    pub quantity: u32,
    /// Line total.
    pub total: i64,
}

/// Contact and delivery details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Customer full name.
    #[serde(default)]
    pub customer_name: String,
    /// Contact email; also used for subscriber enrollment.
    #[serde(default)]
    pub email: String,
    /// Contact phone number.
    #[serde(default)]
    pub phone: String,
    /// Street address.
    #[serde(default)]
    pub address: String,
    /// City.
    #[serde(default)]
    pub city: String,
    /// State or region.
    #[serde(default)]
    pub state: String,
}

impl CustomerDetails {
    /// Names of the fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("customer_name", &self.customer_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Monetary totals of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAmounts {
    /// Sum of line totals.
    pub subtotal: i64,
    /// Shipping fee.
    pub shipping: i64,
    /// Amount due.
    pub total: i64,
}

/// Checkout input, validated before an order number is assigned.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// Checkout channel.
    pub channel: Channel,
    /// Account placing the order.
    pub user_id: UserId,
    /// Contact and delivery details.
    pub customer: CustomerDetails,
    /// Ordered line items.
    pub items: Vec<OrderItem>,
    /// Totals.
    pub amounts: OrderAmounts,
    /// Free-form customer notes.
    pub notes: String,
    /// Gateway reference supplied by the client, if any.
    pub payment_reference: Option<String>,
}

impl OrderDraft {
    /// Check the channel's preconditions.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Validation` if there are no items, or if an
    /// assisted order is missing any contact field.
    pub fn validate(&self) -> Result<()> {
        if self.channel == Channel::Assisted {
            let missing = self.customer.missing_fields();
            if !missing.is_empty() {
                return Err(CommerceError::Validation(format!(
                    "Missing required fields: {} are required",
                    missing.join(", ")
                )));
            }
        }

        if self.items.is_empty() {
            return Err(CommerceError::Validation(
                "Order must contain at least one item".into(),
            ));
        }

        Ok(())
    }

    /// Produce the insertable record for a given order number.
    #[must_use]
    pub fn to_new_order(&self, order_number: OrderNumber) -> NewOrder {
        NewOrder {
            order_number,
            user_id: self.user_id,
            order_type: self.channel,
            customer: self.customer.clone(),
            items: self.items.clone(),
            amounts: self.amounts,
            notes: self.notes.clone(),
            payment_reference: self
                .payment_reference
                .clone()
                .filter(|r| !r.trim().is_empty()),
            payment_status: PaymentStatus::Pending,
            delivery_status: self.channel.initial_delivery_status(),
        }
    }
}

/// An order ready to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Public order number.
    pub order_number: OrderNumber,
    /// Owning account.
    pub user_id: UserId,
    /// Checkout channel.
    pub order_type: Channel,
    /// Contact and delivery details.
    pub customer: CustomerDetails,
    /// Line items.
    pub items: Vec<OrderItem>,
    /// Totals.
    pub amounts: OrderAmounts,
    /// Customer notes.
    pub notes: String,
    /// Gateway reference.
    pub payment_reference: Option<String>,
    /// Initial payment status.
    pub payment_status: PaymentStatus,
    /// Initial delivery status.
    pub delivery_status: DeliveryStatus,
}

impl NewOrder {
    /// Materialise the record with server-assigned id and timestamps.
    #[must_use]
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            order_number: self.order_number,
            user_id: self.user_id,
            order_type: self.order_type,
            customer: self.customer,
            items: self.items,
            amounts: self.amounts,
            notes: self.notes,
            payment_reference: self.payment_reference,
            payment_status: self.payment_status,
            delivery_status: self.delivery_status,
            created_at,
            updated_at: created_at,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Internal identifier.
    pub id: OrderId,
    /// Public order number.
    pub order_number: OrderNumber,
    /// Owning account.
    pub user_id: UserId,
    /// Checkout channel; never changes.
    pub order_type: Channel,
    /// Contact and delivery details.
    #[serde(flatten)]
    pub customer: CustomerDetails,
    /// Line items, in checkout order.
    pub items: Vec<OrderItem>,
    /// Totals.
    #[serde(flatten)]
    pub amounts: OrderAmounts,
    /// Customer notes.
    pub notes: String,
    /// Gateway reference, once payment has been initiated or confirmed.
    pub payment_reference: Option<String>,
    /// Financial settlement state.
    pub payment_status: PaymentStatus,
    /// Fulfilment state.
    pub delivery_status: DeliveryStatus,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last status mutation.
    pub updated_at: DateTime<Utc>,
}

/// Requested status change; absent fields keep their stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New delivery status.
    pub delivery_status: Option<DeliveryStatus>,
    /// New payment status.
    pub payment_status: Option<PaymentStatus>,
}

impl StatusUpdate {
    /// Parse raw status strings. Blank strings count as "not provided".
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidStatus` for values outside either set.
    pub fn parse(delivery: Option<&str>, payment: Option<&str>) -> Result<Self> {
        let delivery_status = delivery
            .filter(|s| !s.is_empty())
            .map(str::parse::<DeliveryStatus>)
            .transpose()?;
        let payment_status = payment
            .filter(|s| !s.is_empty())
            .map(str::parse::<PaymentStatus>)
            .transpose()?;

        Ok(Self {
            delivery_status,
            payment_status,
        })
    }
}

/// Outcome of a status update.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Delivery status before the update.
    pub previous_delivery: DeliveryStatus,
    /// Payment status before the update.
    pub previous_payment: PaymentStatus,
    /// The order after the update.
    pub order: Order,
}

impl StatusChange {
    /// `(old, new)` when the delivery status actually changed.
    #[must_use]
    pub fn delivery_transition(&self) -> Option<(DeliveryStatus, DeliveryStatus)> {
        (self.previous_delivery != self.order.delivery_status)
            .then_some((self.previous_delivery, self.order.delivery_status))
    }
}

/// Outcome of recording a confirmed payment.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    /// The order after confirmation.
    pub order: Order,
    /// `false` when the order was already paid before this confirmation.
    pub newly_paid: bool,
}

impl Order {
    /// Apply a coalescing status update.
    ///
    /// `updated_at` always advances, even when neither status changes.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidTransition` if the policy rejects either change.
    pub fn apply_status_update(
        &self,
        update: &StatusUpdate,
        policy: TransitionPolicy,
        now: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let delivery = update.delivery_status.unwrap_or(self.delivery_status);
        let payment = update.payment_status.unwrap_or(self.payment_status);

        policy.check_delivery(self.delivery_status, delivery)?;
        policy.check_payment(self.payment_status, payment)?;

        let mut order = self.clone();
        order.delivery_status = delivery;
        order.payment_status = payment;
        order.updated_at = advance_timestamp(self.updated_at, now);

        Ok(StatusChange {
            previous_delivery: self.delivery_status,
            previous_payment: self.payment_status,
            order,
        })
    }

    /// Mark the order paid under a gateway reference.
    ///
    /// Re-confirming an already paid order leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidTransition` if the policy rejects the change.
    pub fn confirm_payment(
        &self,
        reference: &str,
        policy: TransitionPolicy,
        now: DateTime<Utc>,
    ) -> Result<PaymentConfirmation> {
        if self.payment_status == PaymentStatus::Paid {
            return Ok(PaymentConfirmation {
                order: self.clone(),
                newly_paid: false,
            });
        }

        policy.check_payment(self.payment_status, PaymentStatus::Paid)?;

        let mut order = self.clone();
        order.payment_status = PaymentStatus::Paid;
        order.payment_reference = Some(reference.to_string());
        order.updated_at = advance_timestamp(self.updated_at, now);

        Ok(PaymentConfirmation {
            order,
            newly_paid: true,
        })
    }
}

/// Admin view of an order joined with the owning account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithUser {
    /// The order.
    #[serde(flatten)]
    pub order: Order,
    /// Account name, if the account still exists.
    pub user_name: Option<String>,
    /// Account email, if the account still exists.
    pub user_email: Option<String>,
}

/// Timestamp strictly after `previous`, normally `now`.
///
/// Stored timestamps have microsecond precision, so two updates inside the
/// same microsecond are pushed apart.
#[must_use]
pub fn advance_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now >= floor {
        now
    } else {
        floor
    }
}
