//! In-memory storage backend.
//!
//! All tables live behind a single tokio `RwLock`, so every trait method is
//! atomic with respect to the others. Rows are kept in insertion order and
//! listed newest first by iterating in reverse. Nothing survives a restart.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use palmport_core::{
    accumulate_quantity, Account, Batch, BatchFields, BatchRecordId, BatchView, CartAddOutcome,
    CartItem, DeliveryStatus, NewAccount, NewBatch, NewOrder, Order, OrderId, OrderWithUser,
    PaymentConfirmation, Product, ProductFields, ProductId, ShippingSettings, StatusChange,
    StatusUpdate, Subscriber, SubscriberId, TransitionPolicy, UserId,
};

use crate::{DashboardCounts, OrderPage, Result, Store, StoreError};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    orders: Vec<Order>,
    cart: Vec<CartItem>,
    subscribers: Vec<Subscriber>,
    products: Vec<Product>,
    batches: Vec<Batch>,
    shipping: Option<ShippingSettings>,
}

impl Tables {
    fn account(&self, user_id: &UserId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == *user_id)
    }

    fn with_user(&self, order: &Order) -> OrderWithUser {
        let account = self.account(&order.user_id);
        OrderWithUser {
            order: order.clone(),
            user_name: account.map(|a| a.name.clone()),
            user_email: account.map(|a| a.email.clone()),
        }
    }

    fn batch_view(&self, batch: &Batch) -> BatchView {
        let product = batch
            .fields
            .product_id
            .and_then(|pid| self.products.iter().find(|p| p.id == pid));
        BatchView::new(batch.clone(), product)
    }
}

/// In-memory [`Store`] implementation.
///
/// Cloning is cheap and clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut tables = self.tables.write().await;
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict {
                entity: "account",
                key: account.email,
            });
        }
        let account = account.into_account(UserId::generate(), Utc::now());
        tables.accounts.push(account.clone());
        Ok(account)
    }

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.tables.read().await.account(user_id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let mut tables = self.tables.write().await;
        if tables
            .orders
            .iter()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::Conflict {
                entity: "order",
                key: order.order_number.to_string(),
            });
        }
        let order = order.into_order(OrderId::generate(), Utc::now());
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == *order_id).cloned())
    }

    async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.order_number.as_str() == order_number)
            .cloned())
    }

    async fn list_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn list_orders_with_users(&self) -> Result<Vec<OrderWithUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .map(|o| tables.with_user(o))
            .collect())
    }

    async fn list_orders_page(&self, limit: u32, offset: u32) -> Result<OrderPage> {
        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|o| tables.with_user(o))
            .collect();
        Ok(OrderPage {
            orders,
            total: tables.orders.len() as u64,
        })
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        update: &StatusUpdate,
        policy: TransitionPolicy,
    ) -> Result<StatusChange> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .orders
            .iter_mut()
            .find(|o| o.id == *order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;

        let change = slot.apply_status_update(update, policy, Utc::now())?;
        *slot = change.order.clone();
        Ok(change)
    }

    async fn confirm_payment_and_clear_cart(
        &self,
        reference: &str,
        user_id: &UserId,
        policy: TransitionPolicy,
    ) -> Result<PaymentConfirmation> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .orders
            .iter_mut()
            .find(|o| o.order_number.as_str() == reference)
            .ok_or_else(|| StoreError::not_found("order", reference))?;

        let confirmation = slot.confirm_payment(reference, policy, Utc::now())?;
        if confirmation.newly_paid {
            *slot = confirmation.order.clone();
            tables.cart.retain(|item| item.user_id != *user_id);
        }
        Ok(confirmation)
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts> {
        let tables = self.tables.read().await;
        Ok(DashboardCounts {
            total_orders: tables.orders.len() as u64,
            pending_orders: tables
                .orders
                .iter()
                .filter(|o| o.delivery_status == DeliveryStatus::Pending)
                .count() as u64,
            total_batches: tables.batches.len() as u64,
            total_subscribers: tables.subscribers.len() as u64,
        })
    }

    async fn list_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart
            .iter()
            .filter(|item| item.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartAddOutcome> {
        let mut tables = self.tables.write().await;
        if let Some(item) = tables
            .cart
            .iter_mut()
            .find(|item| item.user_id == *user_id && item.product_id == *product_id)
        {
            item.quantity = accumulate_quantity(item.quantity, quantity)?;
            return Ok(CartAddOutcome::Accumulated);
        }
        tables.cart.push(CartItem {
            user_id: *user_id,
            product_id: *product_id,
            quantity: accumulate_quantity(0, quantity)?,
            created_at: Utc::now(),
        });
        Ok(CartAddOutcome::Inserted)
    }

    async fn remove_from_cart(&self, user_id: &UserId, product_id: &ProductId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.cart.len();
        tables
            .cart
            .retain(|item| !(item.user_id == *user_id && item.product_id == *product_id));
        Ok(tables.cart.len() != before)
    }

    async fn insert_subscriber(&self, email: &str) -> Result<Option<Subscriber>> {
        let mut tables = self.tables.write().await;
        if tables.subscribers.iter().any(|s| s.email == email) {
            return Ok(None);
        }
        let subscriber = Subscriber {
            id: SubscriberId::generate(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        tables.subscribers.push(subscriber.clone());
        Ok(Some(subscriber))
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let tables = self.tables.read().await;
        Ok(tables.subscribers.iter().rev().cloned().collect())
    }

    async fn delete_subscriber(&self, id: &SubscriberId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .subscribers
            .iter()
            .position(|s| s.id == *id)
            .ok_or_else(|| StoreError::not_found("subscriber", id))?;
        tables.subscribers.remove(index);
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().rev().cloned().collect())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == *product_id).cloned())
    }

    async fn insert_product(
        &self,
        fields: ProductFields,
        image_url: Option<String>,
    ) -> Result<Product> {
        let product = Product {
            id: ProductId::generate(),
            fields,
            image_url,
            created_at: Utc::now(),
        };
        self.tables.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: &ProductId,
        fields: ProductFields,
        image_url: Option<String>,
    ) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == *product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        product.fields = fields;
        if image_url.is_some() {
            product.image_url = image_url;
        }
        Ok(product.clone())
    }

    async fn delete_product(&self, product_id: &ProductId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .products
            .iter()
            .position(|p| p.id == *product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        tables.products.remove(index);
        for batch in &mut tables.batches {
            if batch.fields.product_id == Some(*product_id) {
                batch.fields.product_id = None;
            }
        }
        Ok(())
    }

    async fn list_batches(&self) -> Result<Vec<BatchView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .batches
            .iter()
            .rev()
            .map(|b| tables.batch_view(b))
            .collect())
    }

    async fn find_batch(&self, batch_id: &str) -> Result<Option<BatchView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .batches
            .iter()
            .find(|b| b.batch_id == batch_id)
            .map(|b| tables.batch_view(b)))
    }

    async fn insert_batch(&self, batch: NewBatch) -> Result<Batch> {
        let mut tables = self.tables.write().await;
        if tables.batches.iter().any(|b| b.batch_id == batch.batch_id) {
            return Err(StoreError::Conflict {
                entity: "batch",
                key: batch.batch_id,
            });
        }
        let batch = batch.into_batch(BatchRecordId::generate(), Utc::now());
        tables.batches.push(batch.clone());
        Ok(batch)
    }

    async fn update_batch(
        &self,
        id: &BatchRecordId,
        fields: BatchFields,
        image_url: Option<String>,
    ) -> Result<Batch> {
        let mut tables = self.tables.write().await;
        let batch = tables
            .batches
            .iter_mut()
            .find(|b| b.id == *id)
            .ok_or_else(|| StoreError::not_found("batch", id))?;
        batch.fields = fields;
        if image_url.is_some() {
            batch.image_url = image_url;
        }
        Ok(batch.clone())
    }

    async fn delete_batch(&self, id: &BatchRecordId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .batches
            .iter()
            .position(|b| b.id == *id)
            .ok_or_else(|| StoreError::not_found("batch", id))?;
        tables.batches.remove(index);
        Ok(())
    }

    async fn get_shipping_settings(&self) -> Result<Option<ShippingSettings>> {
        Ok(self.tables.read().await.shipping)
    }

    async fn put_shipping_settings(&self, settings: ShippingSettings) -> Result<ShippingSettings> {
        let stored = ShippingSettings {
            updated_at: Some(Utc::now()),
            ..settings
        };
        self.tables.write().await.shipping = Some(stored);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palmport_core::{
        Channel, CommerceError, CustomerDetails, OrderAmounts, OrderItem, OrderNumber,
        PaymentStatus, Role, MAX_CART_QUANTITY,
    };

    async fn account(store: &MemoryStore, email: &str) -> Account {
        store
            .create_account(NewAccount {
                name: "Ada Obi".into(),
                email: email.into(),
                password_hash: "hash".into(),
                role: Role::User,
            })
            .await
            .unwrap()
    }

    fn new_order(user_id: UserId, channel: Channel) -> NewOrder {
        NewOrder {
            order_number: OrderNumber::generate(channel),
            user_id,
            order_type: channel,
            customer: CustomerDetails::default(),
            items: vec![OrderItem {
                name: "Red Palm Oil".into(),
                size: "5L".into(),
                quantity: 1,
                total: 7500,
            }],
            amounts: OrderAmounts {
                subtotal: 7500,
                shipping: 1000,
                total: 8500,
            },
            notes: String::new(),
            payment_reference: None,
            payment_status: PaymentStatus::Pending,
            delivery_status: channel.initial_delivery_status(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        account(&store, "ada@example.com").await;
        let err = store
            .create_account(NewAccount {
                name: "Other".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
                role: Role::User,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { entity: "account", .. }));
    }

    #[tokio::test]
    async fn duplicate_order_number_conflicts() {
        let store = MemoryStore::new();
        let user = account(&store, "ada@example.com").await;
        let order = new_order(user.id, Channel::Online);
        store.insert_order(order.clone()).await.unwrap();
        assert!(matches!(
            store.insert_order(order).await,
            Err(StoreError::Conflict { entity: "order", .. })
        ));
    }

    #[tokio::test]
    async fn orders_list_newest_first_with_user_info() {
        let store = MemoryStore::new();
        let user = account(&store, "ada@example.com").await;
        let first = store.insert_order(new_order(user.id, Channel::Online)).await.unwrap();
        let second = store
            .insert_order(new_order(user.id, Channel::Assisted))
            .await
            .unwrap();

        let mine = store.list_orders_for_user(&user.id).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id);
        assert_eq!(mine[1].id, first.id);

        let all = store.list_orders_with_users().await.unwrap();
        assert_eq!(all[0].user_email.as_deref(), Some("ada@example.com"));

        let page = store.list_orders_page(1, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.orders.len(), 1);
        assert_eq!(page.orders[0].order.id, first.id);
    }

    #[tokio::test]
    async fn status_update_on_missing_order() {
        let store = MemoryStore::new();
        let err = store
            .update_order_status(
                &OrderId::generate(),
                &StatusUpdate::default(),
                TransitionPolicy::Permissive,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "order", .. }));
    }

    #[tokio::test]
    async fn rejected_transition_leaves_order_unchanged() {
        let store = MemoryStore::new();
        let user = account(&store, "ada@example.com").await;
        let order = store.insert_order(new_order(user.id, Channel::Online)).await.unwrap();

        let delivered = StatusUpdate {
            delivery_status: Some(DeliveryStatus::Delivered),
            payment_status: None,
        };
        store
            .update_order_status(&order.id, &delivered, TransitionPolicy::Strict)
            .await
            .unwrap();

        let back = StatusUpdate {
            delivery_status: Some(DeliveryStatus::Processing),
            payment_status: None,
        };
        let err = store
            .update_order_status(&order.id, &back, TransitionPolicy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(CommerceError::InvalidTransition { .. })
        ));

        let stored = store.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.delivery_status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn confirm_payment_clears_only_the_buyers_cart() {
        let store = MemoryStore::new();
        let buyer = account(&store, "ada@example.com").await;
        let other = account(&store, "bola@example.com").await;
        let product = ProductId::generate();
        store.add_to_cart(&buyer.id, &product, 2).await.unwrap();
        store.add_to_cart(&other.id, &product, 1).await.unwrap();

        let order = store.insert_order(new_order(buyer.id, Channel::Online)).await.unwrap();
        let reference = order.order_number.to_string();

        let confirmation = store
            .confirm_payment_and_clear_cart(&reference, &buyer.id, TransitionPolicy::Permissive)
            .await
            .unwrap();
        assert!(confirmation.newly_paid);
        assert_eq!(confirmation.order.payment_status, PaymentStatus::Paid);
        assert!(store.list_cart(&buyer.id).await.unwrap().is_empty());
        assert_eq!(store.list_cart(&other.id).await.unwrap().len(), 1);

        let again = store
            .confirm_payment_and_clear_cart(&reference, &buyer.id, TransitionPolicy::Permissive)
            .await
            .unwrap();
        assert!(!again.newly_paid);
    }

    #[tokio::test]
    async fn repeated_confirmation_keeps_a_refilled_cart() {
        let store = MemoryStore::new();
        let buyer = account(&store, "ada@example.com").await;
        let order = store.insert_order(new_order(buyer.id, Channel::Online)).await.unwrap();
        let reference = order.order_number.to_string();
        store
            .confirm_payment_and_clear_cart(&reference, &buyer.id, TransitionPolicy::Permissive)
            .await
            .unwrap();

        let product = ProductId::generate();
        store.add_to_cart(&buyer.id, &product, 2).await.unwrap();
        let again = store
            .confirm_payment_and_clear_cart(&reference, &buyer.id, TransitionPolicy::Permissive)
            .await
            .unwrap();
        assert!(!again.newly_paid);

        let cart = store.list_cart(&buyer.id).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 2);
    }

    #[tokio::test]
    async fn confirm_payment_for_unknown_reference_keeps_cart() {
        let store = MemoryStore::new();
        let buyer = account(&store, "ada@example.com").await;
        store
            .add_to_cart(&buyer.id, &ProductId::generate(), 1)
            .await
            .unwrap();

        let err = store
            .confirm_payment_and_clear_cart("PALM-0-00000", &buyer.id, TransitionPolicy::Permissive)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.list_cart(&buyer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cart_quantity_accumulates() {
        let store = MemoryStore::new();
        let user = UserId::generate();
        let product = ProductId::generate();

        assert_eq!(
            store.add_to_cart(&user, &product, 2).await.unwrap(),
            CartAddOutcome::Inserted
        );
        assert_eq!(
            store.add_to_cart(&user, &product, 3).await.unwrap(),
            CartAddOutcome::Accumulated
        );
        let cart = store.list_cart(&user).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 5);

        assert!(store.remove_from_cart(&user, &product).await.unwrap());
        assert!(!store.remove_from_cart(&user, &product).await.unwrap());
    }

    #[tokio::test]
    async fn cart_quantity_past_the_limit_is_rejected() {
        let store = MemoryStore::new();
        let user = UserId::generate();
        let product = ProductId::generate();
        store.add_to_cart(&user, &product, MAX_CART_QUANTITY).await.unwrap();

        let err = store.add_to_cart(&user, &product, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(CommerceError::Validation(_))));
        assert_eq!(store.list_cart(&user).await.unwrap()[0].quantity, MAX_CART_QUANTITY);
    }

    #[tokio::test]
    async fn subscribers_are_insert_once() {
        let store = MemoryStore::new();
        let first = store.insert_subscriber("ada@example.com").await.unwrap();
        assert!(first.is_some());
        assert!(store.insert_subscriber("ada@example.com").await.unwrap().is_none());
        assert_eq!(store.list_subscribers().await.unwrap().len(), 1);

        let id = first.unwrap().id;
        store.delete_subscriber(&id).await.unwrap();
        assert!(matches!(
            store.delete_subscriber(&id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn product_update_keeps_image_when_none_given() {
        let store = MemoryStore::new();
        let fields = ProductFields {
            name: "Red Palm Oil".into(),
            price: 7500,
            ..ProductFields::default()
        };
        let product = store
            .insert_product(fields.clone(), Some("https://img/1.png".into()))
            .await
            .unwrap();

        let updated = store
            .update_product(
                &product.id,
                ProductFields {
                    price: 8000,
                    ..fields
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.fields.price, 8000);
        assert_eq!(updated.image_url.as_deref(), Some("https://img/1.png"));
    }

    #[tokio::test]
    async fn batches_join_product_info() {
        let store = MemoryStore::new();
        let product = store
            .insert_product(
                ProductFields {
                    name: "Red Palm Oil".into(),
                    size: "5L".into(),
                    price: 7500,
                    ..ProductFields::default()
                },
                None,
            )
            .await
            .unwrap();

        let batch = NewBatch {
            batch_id: "PP-2501".into(),
            fields: BatchFields {
                title: "January pressing".into(),
                product_id: Some(product.id),
                ..BatchFields::default()
            },
            qr_code_url: "data:image/png;base64,AAAA".into(),
            image_url: None,
        };
        store.insert_batch(batch.clone()).await.unwrap();
        assert!(matches!(
            store.insert_batch(batch).await,
            Err(StoreError::Conflict { entity: "batch", .. })
        ));

        let view = store.find_batch("PP-2501").await.unwrap().unwrap();
        assert_eq!(view.product_name.as_deref(), Some("Red Palm Oil"));
        assert_eq!(view.product_size.as_deref(), Some("5L"));
        assert!(store.find_batch("PP-0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn shipping_settings_upsert() {
        let store = MemoryStore::new();
        assert!(store.get_shipping_settings().await.unwrap().is_none());

        let saved = store
            .put_shipping_settings(ShippingSettings::new(1500, 20_000).unwrap())
            .await
            .unwrap();
        assert!(saved.updated_at.is_some());
        assert_eq!(
            store.get_shipping_settings().await.unwrap().unwrap().shipping_fee,
            1500
        );
    }

    #[tokio::test]
    async fn dashboard_counts_pending_deliveries() {
        let store = MemoryStore::new();
        let user = account(&store, "ada@example.com").await;
        store.insert_order(new_order(user.id, Channel::Online)).await.unwrap();
        store.insert_order(new_order(user.id, Channel::Assisted)).await.unwrap();
        store.insert_subscriber("ada@example.com").await.unwrap();

        let counts = store.dashboard_counts().await.unwrap();
        assert_eq!(counts.total_orders, 2);
        assert_eq!(counts.pending_orders, 1);
        assert_eq!(counts.total_subscribers, 1);
        assert_eq!(counts.total_batches, 0);
    }
}
