// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{CartStore, CatalogStore, OrderStore, StockDecrement, StoreError};
use crate::models::{
  CartLineKey, Order, OrderItem, OrderStatus, OrderTransition, PaymentInfo, PaymentMethod, PaymentStatus, Product,
  ProductImage, ShippingAddress, Variation,
};

/// Postgres-backed store. See `schema.sql` for the tables it expects.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
    let pool = PgPool::connect(database_url).await?;
    Ok(Self::new(pool))
  }
}

#[derive(FromRow)]
struct ProductRow {
  product_id: i64,
  name: String,
  price: i64,
  description: Option<String>,
  images: Json<Vec<ProductImage>>,
}

#[derive(FromRow)]
struct VariationRow {
  id: Uuid,
  size: String,
  color: String,
  amount: i32,
}

#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  items: Json<Vec<OrderItem>>,
  total_price: i64,
  status: OrderStatus,
  payment_method: PaymentMethod,
  payment_status: PaymentStatus,
  transaction_id: Option<String>,
  full_name: String,
  phone: String,
  address: String,
  distance_km: f64,
  shipping_fee: i64,
  note: String,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
  fn from(row: OrderRow) -> Self {
    Order {
      id: row.id,
      user_id: row.user_id,
      items: row.items.0,
      total_price: row.total_price,
      status: row.status,
      payment: PaymentInfo {
        method: row.payment_method,
        transaction_id: row.transaction_id,
        status: row.payment_status,
      },
      shipping_address: ShippingAddress {
        full_name: row.full_name,
        phone: row.phone,
        address: row.address,
        distance: row.distance_km,
        shipping_fee: row.shipping_fee,
      },
      note: row.note,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

const ORDER_COLUMNS: &str = "id, user_id, items, total_price, status, payment_method, payment_status, transaction_id, \
   full_name, phone, address, distance_km, shipping_fee, note, created_at, updated_at";

#[async_trait]
impl CatalogStore for PgStore {
  async fn find_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
    let Some(row) = sqlx::query_as::<_, ProductRow>(
      "SELECT product_id, name, price, description, images FROM products WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?
    else {
      return Ok(None);
    };

    let variations = sqlx::query_as::<_, VariationRow>(
      "SELECT id, size, color, amount FROM product_variations WHERE product_id = $1 ORDER BY position",
    )
    .bind(product_id)
    .fetch_all(&self.pool)
    .await?
    .into_iter()
    .map(|v| Variation {
      id: v.id,
      size: v.size,
      color: v.color,
      amount: v.amount,
    })
    .collect();

    Ok(Some(Product {
      id: row.product_id,
      name: row.name,
      price: row.price,
      description: row.description,
      images: row.images.0,
      variations,
    }))
  }

  async fn find_product_by_variation(&self, variation_id: Uuid) -> Result<Option<i64>, StoreError> {
    let product_id = sqlx::query_scalar::<_, i64>("SELECT product_id FROM product_variations WHERE id = $1")
      .bind(variation_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product_id)
  }

  async fn decrement_stock(&self, batch: &[StockDecrement]) -> Result<Vec<bool>, StoreError> {
    let mut tx = self.pool.begin().await?;
    let mut applied = Vec::with_capacity(batch.len());
    for d in batch {
      let result = sqlx::query(
        "UPDATE product_variations SET amount = amount - $3 \
         WHERE product_id = $1 AND id = $2 AND amount >= $3",
      )
      .bind(d.product_id)
      .bind(d.variation_id)
      .bind(d.quantity)
      .execute(&mut *tx)
      .await?;
      applied.push(result.rows_affected() == 1);
    }
    tx.commit().await?;
    Ok(applied)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn insert(&self, order: &Order) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO orders (id, user_id, items, total_price, status, payment_method, payment_status, transaction_id, \
       full_name, phone, address, distance_km, shipping_fee, note, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(Json(&order.items))
    .bind(order.total_price)
    .bind(order.status)
    .bind(order.payment.method)
    .bind(order.payment.status)
    .bind(order.payment.transaction_id.as_deref())
    .bind(&order.shipping_address.full_name)
    .bind(&order.shipping_address.phone)
    .bind(&order.shipping_address.address)
    .bind(order.shipping_address.distance)
    .bind(order.shipping_address.shipping_fee)
    .bind(&order.note)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn find(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn find_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {} FROM orders WHERE id = $1 AND user_id = $2",
      ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row.map(Order::from))
  }

  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(Order::from).collect())
  }

  async fn delete(&self, order_id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(order_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn set_transaction_id(&self, order_id: Uuid, transaction_id: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("UPDATE orders SET transaction_id = $2, updated_at = now() WHERE id = $1")
      .bind(order_id)
      .bind(transaction_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn transition(&self, order_id: Uuid, transition: &OrderTransition) -> Result<bool, StoreError> {
    let result = sqlx::query(
      "UPDATE orders SET status = $4, \
         payment_status = COALESCE($5, payment_status), \
         transaction_id = COALESCE($6, transaction_id), \
         updated_at = now() \
       WHERE id = $1 AND status = $2 AND payment_status = $3",
    )
    .bind(order_id)
    .bind(transition.expected_status)
    .bind(transition.expected_payment_status)
    .bind(transition.new_status)
    .bind(transition.new_payment_status)
    .bind(transition.transaction_id.as_deref())
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() == 1)
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn remove_items(&self, user_id: Uuid, keys: &[CartLineKey]) -> Result<usize, StoreError> {
    if keys.is_empty() {
      return Ok(0);
    }
    let product_ids: Vec<i64> = keys.iter().map(|k| k.product_id).collect();
    let sizes: Vec<String> = keys.iter().map(|k| k.size.clone()).collect();
    let colors: Vec<String> = keys.iter().map(|k| k.color.clone()).collect();
    let result = sqlx::query(
      "DELETE FROM cart_items c USING UNNEST($2::bigint[], $3::text[], $4::text[]) AS k(product_id, size, color) \
       WHERE c.user_id = $1 AND c.product_id = k.product_id AND c.size = k.size AND c.color = k.color",
    )
    .bind(user_id)
    .bind(&product_ids)
    .bind(&sizes)
    .bind(&colors)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() as usize)
  }
}
