// src/store/mod.rs

//! Persistence seams used by the checkout workflow.
//!
//! `PgStore` backs production; `MemoryStore` is used when no database is
//! configured and by the test-suite.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CartLineKey, Order, OrderTransition, Product};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Stored record could not be (de)serialized: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Store unavailable: {0}")]
  Unavailable(String),
}

/// One conditional stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
  pub product_id: i64,
  pub variation_id: Uuid,
  pub quantity: i32,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn find_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;

  /// Owning product of a variation.
  async fn find_product_by_variation(&self, variation_id: Uuid) -> Result<Option<i64>, StoreError>;

  /// Applies every decrement in one batch. Each entry subtracts `quantity`
  /// only while the variation still holds at least that much, so stock never
  /// goes negative. Returns, per entry, whether it was applied.
  async fn decrement_stock(&self, batch: &[StockDecrement]) -> Result<Vec<bool>, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert(&self, order: &Order) -> Result<(), StoreError>;

  async fn find(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

  async fn find_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError>;

  /// Orders of a user, newest first.
  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;

  /// Returns whether a row was removed.
  async fn delete(&self, order_id: Uuid) -> Result<bool, StoreError>;

  async fn set_transaction_id(&self, order_id: Uuid, transaction_id: &str) -> Result<bool, StoreError>;

  /// Applies `transition` only if the order is still in the expected state.
  /// Returns whether it was applied.
  async fn transition(&self, order_id: Uuid, transition: &OrderTransition) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  /// Removes the lines matching `keys` from the user's cart. Returns how many were removed.
  async fn remove_items(&self, user_id: Uuid, keys: &[CartLineKey]) -> Result<usize, StoreError>;
}
