//! PostgreSQL storage backend.
//!
//! Queries are built at runtime (`sqlx::query_as`) so the crate compiles
//! without a live database. Rows are decoded into private `*Row` structs and
//! converted into domain types, which is where stored status strings are
//! parsed back into enums.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{debug, info};
use uuid::Uuid;

use palmport_core::{
    accumulate_quantity, Account, Batch, BatchFields, BatchRecordId, BatchView, CartAddOutcome,
    CartItem, Channel, CommerceError, CustomerDetails, NewAccount, NewBatch, NewOrder, Order,
    OrderAmounts, OrderId, OrderItem, OrderNumber, OrderWithUser, PaymentConfirmation, Product,
    ProductFields, ProductId, ShippingSettings, StatusChange, StatusUpdate, Subscriber,
    SubscriberId, TransitionPolicy, UserId, MAX_CART_QUANTITY,
};

use crate::schema::MIGRATOR;
use crate::{DashboardCounts, OrderPage, Result, Store, StoreError};

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

const ORDER_COLUMNS: &str = "id, order_number, user_id, order_type, customer_name, email, phone, \
     address, city, state, items, subtotal, shipping, total, notes, payment_reference, \
     payment_status, delivery_status, created_at, updated_at";

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, original_price, size, features, in_stock, image_url, created_at";

const BATCH_COLUMNS: &str = "id, batch_id, title, state, manufacturer, quality, notes, \
     manufacture_date, product_id, qr_code_url, image_url, created_at";

/// Default pool size.
const MAX_CONNECTIONS: u32 = 10;

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(decode_error)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    order_type: String,
    customer_name: String,
    email: String,
    phone: String,
    address: String,
    city: String,
    state: String,
    items: Json<Vec<OrderItem>>,
    subtotal: i64,
    shipping: i64,
    total: i64,
    notes: String,
    payment_reference: Option<String>,
    payment_status: String,
    delivery_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            order_number: OrderNumber::from_stored(row.order_number),
            user_id: UserId::from_uuid(row.user_id),
            order_type: row.order_type.parse::<Channel>().map_err(decode_error)?,
            customer: CustomerDetails {
                customer_name: row.customer_name,
                email: row.email,
                phone: row.phone,
                address: row.address,
                city: row.city,
                state: row.state,
            },
            items: row.items.0,
            amounts: OrderAmounts {
                subtotal: row.subtotal,
                shipping: row.shipping,
                total: row.total,
            },
            notes: row.notes,
            payment_reference: row.payment_reference,
            payment_status: row.payment_status.parse().map_err(decode_error)?,
            delivery_status: row.delivery_status.parse().map_err(decode_error)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderWithUserRow {
    #[sqlx(flatten)]
    order: OrderRow,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl TryFrom<OrderWithUserRow> for OrderWithUser {
    type Error = StoreError;

    fn try_from(row: OrderWithUserRow) -> Result<Self> {
        Ok(Self {
            order: row.order.try_into()?,
            user_name: row.user_name,
            user_email: row.user_email,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self> {
        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: u32::try_from(row.quantity).map_err(decode_error)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: SubscriberId::from_uuid(row.id),
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: i64,
    original_price: Option<i64>,
    size: String,
    features: Json<Vec<String>>,
    in_stock: bool,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::from_uuid(row.id),
            fields: ProductFields {
                name: row.name,
                description: row.description,
                price: row.price,
                original_price: row.original_price,
                size: row.size,
                features: row.features.0,
                in_stock: row.in_stock,
            },
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BatchRow {
    id: Uuid,
    batch_id: String,
    title: String,
    state: String,
    manufacturer: String,
    quality: String,
    notes: String,
    manufacture_date: Option<NaiveDate>,
    product_id: Option<Uuid>,
    qr_code_url: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Self {
            id: BatchRecordId::from_uuid(row.id),
            batch_id: row.batch_id,
            fields: BatchFields {
                title: row.title,
                state: row.state,
                manufacturer: row.manufacturer,
                quality: row.quality,
                notes: row.notes,
                manufacture_date: row.manufacture_date,
                product_id: row.product_id.map(ProductId::from_uuid),
            },
            qr_code_url: row.qr_code_url,
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BatchViewRow {
    #[sqlx(flatten)]
    batch: BatchRow,
    product_name: Option<String>,
    product_size: Option<String>,
    product_description: Option<String>,
}

impl From<BatchViewRow> for BatchView {
    fn from(row: BatchViewRow) -> Self {
        Self {
            batch: row.batch.into(),
            product_name: row.product_name,
            product_size: row.product_size,
            product_description: row.product_description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShippingRow {
    shipping_fee: i64,
    free_shipping_threshold: i64,
    updated_at: DateTime<Utc>,
}

impl From<ShippingRow> for ShippingSettings {
    fn from(row: ShippingRow) -> Self {
        Self {
            shipping_fee: row.shipping_fee,
            free_shipping_threshold: row.free_shipping_threshold,
            updated_at: Some(row.updated_at),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn decode_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

/// Current time at the precision `TIMESTAMPTZ` stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn unknown_product() -> StoreError {
    StoreError::Rejected(CommerceError::Validation(
        "Linked product does not exist".into(),
    ))
}

// ============================================================================
// PgStore
// ============================================================================

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the pool cannot be established.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        info!("Database migrations applied");
        Ok(())
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row: AccountRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .bind(now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        entity: "account",
                        key: account.email.clone(),
                    }
                } else {
                    e.into()
                }
            })?;
        row.try_into()
    }

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let created_at = now();
        let sql = format!(
            "INSERT INTO orders (
                id, order_number, user_id, order_type, customer_name, email, phone,
                address, city, state, items, subtotal, shipping, total, notes,
                payment_reference, payment_status, delivery_status, created_at, updated_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                     $16, $17, $18, $19, $19)
             RETURNING {ORDER_COLUMNS}"
        );
        let row: OrderRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(order.order_number.as_str())
            .bind(order.user_id.as_uuid())
            .bind(order.order_type.as_str())
            .bind(&order.customer.customer_name)
            .bind(&order.customer.email)
            .bind(&order.customer.phone)
            .bind(&order.customer.address)
            .bind(&order.customer.city)
            .bind(&order.customer.state)
            .bind(Json(&order.items))
            .bind(order.amounts.subtotal)
            .bind(order.amounts.shipping)
            .bind(order.amounts.total)
            .bind(&order.notes)
            .bind(&order.payment_reference)
            .bind(order.payment_status.as_str())
            .bind(order.delivery_status.as_str())
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        entity: "order",
                        key: order.order_number.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;
        debug!(order_number = %order.order_number, "Order inserted");
        row.try_into()
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn list_orders_with_users(&self) -> Result<Vec<OrderWithUser>> {
        sqlx::query_as::<_, OrderWithUserRow>(
            "SELECT o.*, u.name AS user_name, u.email AS user_email
             FROM orders o
             LEFT JOIN users u ON u.id = o.user_id
             ORDER BY o.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(OrderWithUser::try_from)
        .collect()
    }

    async fn list_orders_page(&self, limit: u32, offset: u32) -> Result<OrderPage> {
        let orders = sqlx::query_as::<_, OrderWithUserRow>(
            "SELECT o.*, u.name AS user_name, u.email AS user_email
             FROM orders o
             LEFT JOIN users u ON u.id = o.user_id
             ORDER BY o.created_at DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(OrderWithUser::try_from)
        .collect::<Result<Vec<_>>>()?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(OrderPage {
            orders,
            total: count(total),
        })
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        update: &StatusUpdate,
        policy: TransitionPolicy,
    ) -> Result<StatusChange> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let current: Order = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("order", order_id))?
            .try_into()?;

        let change = current.apply_status_update(update, policy, now())?;

        sqlx::query(
            "UPDATE orders SET delivery_status = $2, payment_status = $3, updated_at = $4
             WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(change.order.delivery_status.as_str())
        .bind(change.order.payment_status.as_str())
        .bind(change.order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(change)
    }

    async fn confirm_payment_and_clear_cart(
        &self,
        reference: &str,
        user_id: &UserId,
        policy: TransitionPolicy,
    ) -> Result<PaymentConfirmation> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1 FOR UPDATE");
        let current: Order = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(reference)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("order", reference))?
            .try_into()?;

        let confirmation = current.confirm_payment(reference, policy, now())?;

        // The cart is only cleared by the verification that marks the order paid.
        let mut cleared = 0;
        if confirmation.newly_paid {
            sqlx::query(
                "UPDATE orders SET payment_status = $2, payment_reference = $3, updated_at = $4
                 WHERE id = $1",
            )
            .bind(confirmation.order.id.as_uuid())
            .bind(confirmation.order.payment_status.as_str())
            .bind(&confirmation.order.payment_reference)
            .bind(confirmation.order.updated_at)
            .execute(&mut *tx)
            .await?;

            cleared = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        debug!(
            reference,
            newly_paid = confirmation.newly_paid,
            cleared,
            "Payment recorded"
        );
        Ok(confirmation)
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts> {
        let (orders, pending, batches, subscribers): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM orders),
                (SELECT COUNT(*) FROM orders WHERE delivery_status = 'pending'),
                (SELECT COUNT(*) FROM batches),
                (SELECT COUNT(*) FROM subscribers)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardCounts {
            total_orders: count(orders),
            pending_orders: count(pending),
            total_batches: count(batches),
            total_subscribers: count(subscribers),
        })
    }

    async fn list_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>> {
        sqlx::query_as::<_, CartRow>(
            "SELECT user_id, product_id, quantity, created_at
             FROM cart_items WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CartItem::try_from)
        .collect()
    }

    async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartAddOutcome> {
        let too_large =
            || StoreError::Rejected(CommerceError::Validation("Quantity is too large".into()));
        let quantity = i32::try_from(accumulate_quantity(0, quantity)?).map_err(|_| too_large())?;

        // xmax is zero only for a freshly inserted tuple. An update that would
        // overflow the column matches no row instead of raising.
        let (inserted,): (bool,) = sqlx::query_as(
            "INSERT INTO cart_items (user_id, product_id, quantity, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
             WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= $5
             RETURNING (xmax = 0)",
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity)
        .bind(now())
        .bind(i64::from(MAX_CART_QUANTITY))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(too_large)?;

        Ok(if inserted {
            CartAddOutcome::Inserted
        } else {
            CartAddOutcome::Accumulated
        })
    }

    async fn remove_from_cart(&self, user_id: &UserId, product_id: &ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_subscriber(&self, email: &str) -> Result<Option<Subscriber>> {
        let row: Option<SubscriberRow> = sqlx::query_as(
            "INSERT INTO subscribers (id, email, created_at) VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING
             RETURNING id, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Subscriber::from))
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(
            "SELECT id, email, created_at FROM subscribers ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn delete_subscriber(&self, id: &SubscriberId) -> Result<()> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("subscriber", id));
        }
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC");
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn insert_product(
        &self,
        fields: ProductFields,
        image_url: Option<String>,
    ) -> Result<Product> {
        let sql = format!(
            "INSERT INTO products (
                id, name, description, price, original_price, size, features,
                in_stock, image_url, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row: ProductRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(fields.price)
            .bind(fields.original_price)
            .bind(&fields.size)
            .bind(Json(&fields.features))
            .bind(fields.in_stock)
            .bind(&image_url)
            .bind(now())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_product(
        &self,
        product_id: &ProductId,
        fields: ProductFields,
        image_url: Option<String>,
    ) -> Result<Product> {
        let sql = format!(
            "UPDATE products SET
                name = $2, description = $3, price = $4, original_price = $5,
                size = $6, features = $7, in_stock = $8,
                image_url = COALESCE($9, image_url)
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(product_id.as_uuid())
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(fields.price)
            .bind(fields.original_price)
            .bind(&fields.size)
            .bind(Json(&fields.features))
            .bind(fields.in_stock)
            .bind(&image_url)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::from)
            .ok_or_else(|| StoreError::not_found("product", product_id))
    }

    async fn delete_product(&self, product_id: &ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", product_id));
        }
        Ok(())
    }

    async fn list_batches(&self) -> Result<Vec<BatchView>> {
        let rows: Vec<BatchViewRow> = sqlx::query_as(
            "SELECT b.*, p.name AS product_name, p.size AS product_size,
                    p.description AS product_description
             FROM batches b
             LEFT JOIN products p ON p.id = b.product_id
             ORDER BY b.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BatchView::from).collect())
    }

    async fn find_batch(&self, batch_id: &str) -> Result<Option<BatchView>> {
        let row: Option<BatchViewRow> = sqlx::query_as(
            "SELECT b.*, p.name AS product_name, p.size AS product_size,
                    p.description AS product_description
             FROM batches b
             LEFT JOIN products p ON p.id = b.product_id
             WHERE b.batch_id = $1",
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BatchView::from))
    }

    async fn insert_batch(&self, batch: NewBatch) -> Result<Batch> {
        let sql = format!(
            "INSERT INTO batches (
                id, batch_id, title, state, manufacturer, quality, notes,
                manufacture_date, product_id, qr_code_url, image_url, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {BATCH_COLUMNS}"
        );
        let row: BatchRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&batch.batch_id)
            .bind(&batch.fields.title)
            .bind(&batch.fields.state)
            .bind(&batch.fields.manufacturer)
            .bind(&batch.fields.quality)
            .bind(&batch.fields.notes)
            .bind(batch.fields.manufacture_date)
            .bind(batch.fields.product_id.map(|p| *p.as_uuid()))
            .bind(&batch.qr_code_url)
            .bind(&batch.image_url)
            .bind(now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        entity: "batch",
                        key: batch.batch_id.clone(),
                    }
                } else if is_foreign_key_violation(&e) {
                    unknown_product()
                } else {
                    e.into()
                }
            })?;
        Ok(row.into())
    }

    async fn update_batch(
        &self,
        id: &BatchRecordId,
        fields: BatchFields,
        image_url: Option<String>,
    ) -> Result<Batch> {
        let sql = format!(
            "UPDATE batches SET
                title = $2, state = $3, manufacturer = $4, quality = $5, notes = $6,
                manufacture_date = $7, product_id = $8,
                image_url = COALESCE($9, image_url)
             WHERE id = $1
             RETURNING {BATCH_COLUMNS}"
        );
        let row: Option<BatchRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(&fields.title)
            .bind(&fields.state)
            .bind(&fields.manufacturer)
            .bind(&fields.quality)
            .bind(&fields.notes)
            .bind(fields.manufacture_date)
            .bind(fields.product_id.map(|p| *p.as_uuid()))
            .bind(&image_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    unknown_product()
                } else {
                    e.into()
                }
            })?;
        row.map(Batch::from)
            .ok_or_else(|| StoreError::not_found("batch", id))
    }

    async fn delete_batch(&self, id: &BatchRecordId) -> Result<()> {
        let result = sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("batch", id));
        }
        Ok(())
    }

    async fn get_shipping_settings(&self) -> Result<Option<ShippingSettings>> {
        let row: Option<ShippingRow> = sqlx::query_as(
            "SELECT shipping_fee, free_shipping_threshold, updated_at
             FROM shipping_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ShippingSettings::from))
    }

    async fn put_shipping_settings(&self, settings: ShippingSettings) -> Result<ShippingSettings> {
        let row: ShippingRow = sqlx::query_as(
            "INSERT INTO shipping_settings (id, shipping_fee, free_shipping_threshold, updated_at)
             VALUES (1, $1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET
                shipping_fee = EXCLUDED.shipping_fee,
                free_shipping_threshold = EXCLUDED.free_shipping_threshold,
                updated_at = EXCLUDED.updated_at
             RETURNING shipping_fee, free_shipping_threshold, updated_at",
        )
        .bind(settings.shipping_fee)
        .bind(settings.free_shipping_threshold)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
