//! Database schema and embedded migrations.
//!
//! The SQL lives in `migrations/` next to this crate's manifest and is
//! compiled into the binary. Tables: `users`, `orders`, `cart_items`,
//! `subscribers`, `products`, `batches` and the singleton
//! `shipping_settings` row.

/// Embedded migrations, applied by [`crate::PgStore::migrate`].
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
