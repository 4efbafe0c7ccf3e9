//! Core types for the PalmPort commerce backend.
//!
//! This crate provides the domain model shared by the store and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `OrderId`, `ProductId`, `BatchRecordId`, `SubscriberId`
//! - **Orders**: `Order`, `OrderDraft`, `OrderNumber`, the two status axes and
//!   the `TransitionPolicy` that governs them
//! - **Accounts**: `Account`, `Role`
//! - **Cart, subscribers, catalog and shipping** records
//!
//! # Amounts
//!
//! All money values are `i64` in the smallest unit the storefront prices in.
//! No currency conversion happens here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod order;
pub mod shipping;
pub mod subscriber;

pub use account::{Account, NewAccount, Role};
pub use cart::{accumulate_quantity, CartAddOutcome, CartItem, MAX_CART_QUANTITY};
pub use catalog::{trace_url, Batch, BatchFields, BatchView, NewBatch, Product, ProductFields};
pub use error::{CommerceError, Result};
pub use ids::{BatchRecordId, IdError, OrderId, ProductId, SubscriberId, UserId};
pub use order::{
    advance_timestamp, Channel, CustomerDetails, DeliveryStatus, NewOrder, Order, OrderAmounts,
    OrderDraft, OrderItem, OrderNumber, OrderWithUser, PaymentConfirmation, PaymentStatus,
    StatusChange, StatusUpdate, TransitionPolicy,
};
pub use shipping::ShippingSettings;
pub use subscriber::{is_plausible_email, Subscriber};
