//! Storage layer for PalmPort.
//!
//! This crate provides persistence for accounts, orders, carts, subscribers,
//! the product catalog, production batches and shipping settings behind the
//! async [`Store`] trait.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL through `sqlx`, with embedded migrations
//!   ([`schema::MIGRATOR`]). Multi-step mutations run in one transaction with
//!   row locks.
//! - [`MemoryStore`]: process-local maps behind tokio locks, used by tests and
//!   for running the service without a database.
//!
//! # Domain rules inside the store
//!
//! Status mutations are decided by [`palmport_core::Order::apply_status_update`]
//! and [`palmport_core::Order::confirm_payment`] while the row is locked, so a
//! rejected transition surfaces as [`StoreError::Rejected`] and nothing is
//! written.
//!
//! # Example
//!
//! ```no_run
//! use palmport_store::{MemoryStore, Store};
//! use palmport_core::{NewAccount, Role};
//!
//! # async fn run() -> palmport_store::Result<()> {
//! let store = MemoryStore::new();
//! let account = store
//!     .create_account(NewAccount {
//!         name: "Ada".into(),
//!         email: "ada@example.com".into(),
//!         password_hash: "$argon2id$...".into(),
//!         role: Role::User,
//!     })
//!     .await?;
//! assert!(store.get_account(&account.id).await?.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::Serialize;

use palmport_core::{
    Account, Batch, BatchFields, BatchRecordId, BatchView, CartAddOutcome, CartItem, NewAccount,
    NewBatch, NewOrder, Order, OrderId, OrderWithUser, PaymentConfirmation, Product, ProductFields,
    ProductId, ShippingSettings, StatusChange, StatusUpdate, Subscriber, SubscriberId,
    TransitionPolicy, UserId,
};

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    /// All orders.
    pub total_orders: u64,
    /// Orders whose delivery status is still `pending`.
    pub pending_orders: u64,
    /// Recorded batches.
    pub total_batches: u64,
    /// Mailing list size.
    pub total_subscribers: u64,
}

/// One page of the admin order list.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    /// Orders on this page, newest first.
    pub orders: Vec<OrderWithUser>,
    /// Orders across all pages.
    pub total: u64,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (`PostgreSQL`, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the email is already registered.
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Get an account by login email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    // =========================================================================
    // Order Operations
    // =========================================================================

    /// Insert an order. The store assigns `id`, `created_at` and `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the order number is taken.
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Get an order by its public order number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>>;

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>>;

    /// List every order with the owning account's name and email, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_orders_with_users(&self) -> Result<Vec<OrderWithUser>>;

    /// List one page of orders with account info, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_orders_page(&self, limit: u32, offset: u32) -> Result<OrderPage>;

    /// Apply a status update atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the order doesn't exist.
    /// - `StoreError::Rejected` if the transition policy forbids the change.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        update: &StatusUpdate,
        policy: TransitionPolicy,
    ) -> Result<StatusChange>;

    /// Mark the order whose number equals `reference` as paid and delete all
    /// of `user_id`'s cart items, in one transaction.
    ///
    /// An order that is already paid is returned unchanged (`newly_paid` is
    /// false); the cart is still cleared.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no order carries that number. Nothing is
    ///   written, the cart included.
    /// - `StoreError::Rejected` if the transition policy forbids the change.
    async fn confirm_payment_and_clear_cart(
        &self,
        reference: &str,
        user_id: &UserId,
        policy: TransitionPolicy,
    ) -> Result<PaymentConfirmation>;

    /// Counts shown on the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn dashboard_counts(&self) -> Result<DashboardCounts>;

    // =========================================================================
    // Cart Operations
    // =========================================================================

    /// List a user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>>;

    /// Add `quantity` units of a product, accumulating onto an existing line.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartAddOutcome>;

    /// Remove one product from a user's cart. Returns whether a line existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn remove_from_cart(&self, user_id: &UserId, product_id: &ProductId) -> Result<bool>;

    // =========================================================================
    // Subscriber Operations
    // =========================================================================

    /// Enroll an email. Returns `None` if it was already subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_subscriber(&self, email: &str) -> Result<Option<Subscriber>>;

    /// List subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>>;

    /// Delete a subscriber.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the subscriber doesn't exist.
    async fn delete_subscriber(&self, id: &SubscriberId) -> Result<()>;

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_product(&self, fields: ProductFields, image_url: Option<String>)
        -> Result<Product>;

    /// Replace a product's fields. `image_url = None` keeps the stored image.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    async fn update_product(
        &self,
        product_id: &ProductId,
        fields: ProductFields,
        image_url: Option<String>,
    ) -> Result<Product>;

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    async fn delete_product(&self, product_id: &ProductId) -> Result<()>;

    /// List batches joined with their products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_batches(&self) -> Result<Vec<BatchView>>;

    /// Look up a batch by its public traceability code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_batch(&self, batch_id: &str) -> Result<Option<BatchView>>;

    /// Insert a batch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the public `batch_id` is taken.
    async fn insert_batch(&self, batch: NewBatch) -> Result<Batch>;

    /// Replace a batch's editable fields. `image_url = None` keeps the stored image.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the batch doesn't exist.
    async fn update_batch(
        &self,
        id: &BatchRecordId,
        fields: BatchFields,
        image_url: Option<String>,
    ) -> Result<Batch>;

    /// Delete a batch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the batch doesn't exist.
    async fn delete_batch(&self, id: &BatchRecordId) -> Result<()>;

    // =========================================================================
    // Shipping Settings
    // =========================================================================

    /// Stored shipping settings, or `None` if an admin never saved any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_shipping_settings(&self) -> Result<Option<ShippingSettings>>;

    /// Upsert the shipping settings and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_shipping_settings(&self, settings: ShippingSettings) -> Result<ShippingSettings>;
}
