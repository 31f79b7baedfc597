// src/store/memory.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CartStore, CatalogStore, OrderStore, StockDecrement, StoreError};
use crate::models::{CartItem, CartLineKey, Order, OrderTransition, Product, ProductImage, Variation};

/// Process-local store. Each operation takes one lock, which makes every
/// conditional update and every decrement batch atomic.
#[derive(Default)]
pub struct MemoryStore {
  products: Mutex<HashMap<i64, Product>>,
  orders: Mutex<HashMap<Uuid, Order>>,
  carts: Mutex<HashMap<Uuid, Vec<CartItem>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn upsert_product(&self, product: Product) {
    self.products.lock().insert(product.id, product);
  }

  pub fn set_cart(&self, user_id: Uuid, items: Vec<CartItem>) {
    self.carts.lock().insert(user_id, items);
  }

  pub fn cart(&self, user_id: Uuid) -> Vec<CartItem> {
    self.carts.lock().get(&user_id).cloned().unwrap_or_default()
  }

  pub fn variation_amount(&self, product_id: i64, variation_id: Uuid) -> Option<i32> {
    let products = self.products.lock();
    products
      .get(&product_id)?
      .variations
      .iter()
      .find(|v| v.id == variation_id)
      .map(|v| v.amount)
  }

  pub fn order_count(&self) -> usize {
    self.orders.lock().len()
  }

  pub fn orders_snapshot(&self) -> Vec<Order> {
    self.orders.lock().values().cloned().collect()
  }

  /// A small catalog to exercise the service without a database.
  pub fn seed_demo_catalog(&self) {
    let image = |n: i32| ProductImage {
      url: format!("https://cdn.example.com/products/{}.jpg", n),
      is_primary: n == 1,
      order: Some(n),
      public_id: None,
    };
    let variation = |size: &str, color: &str, amount: i32| Variation {
      id: Uuid::new_v4(),
      size: size.to_string(),
      color: color.to_string(),
      amount,
    };
    self.upsert_product(Product {
      id: 1,
      name: "Áo thun basic".to_string(),
      price: 100_000,
      description: Some("Cotton tee".to_string()),
      images: vec![image(1), image(2)],
      variations: vec![variation("M", "Black", 20), variation("L", "Black", 10), variation("M", "White", 5)],
    });
    self.upsert_product(Product {
      id: 2,
      name: "Quần jean slim".to_string(),
      price: 350_000,
      description: None,
      images: vec![image(1)],
      variations: vec![variation("30", "Blue", 8), variation("32", "Blue", 3)],
    });
    tracing::info!("Seeded in-memory demo catalog.");
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn find_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
    Ok(self.products.lock().get(&product_id).cloned())
  }

  async fn find_product_by_variation(&self, variation_id: Uuid) -> Result<Option<i64>, StoreError> {
    Ok(
      self
        .products
        .lock()
        .values()
        .find(|p| p.variations.iter().any(|v| v.id == variation_id))
        .map(|p| p.id),
    )
  }

  async fn decrement_stock(&self, batch: &[StockDecrement]) -> Result<Vec<bool>, StoreError> {
    let mut products = self.products.lock();
    let applied = batch
      .iter()
      .map(|d| {
        let Some(variation) = products
          .get_mut(&d.product_id)
          .and_then(|p| p.variations.iter_mut().find(|v| v.id == d.variation_id))
        else {
          return false;
        };
        if variation.amount >= d.quantity {
          variation.amount -= d.quantity;
          true
        } else {
          false
        }
      })
      .collect();
    Ok(applied)
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert(&self, order: &Order) -> Result<(), StoreError> {
    self.orders.lock().insert(order.id, order.clone());
    Ok(())
  }

  async fn find(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    Ok(self.orders.lock().get(&order_id).cloned())
  }

  async fn find_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
    Ok(self.orders.lock().get(&order_id).filter(|o| o.user_id == user_id).cloned())
  }

  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
    let mut orders: Vec<Order> = self
      .orders
      .lock()
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn delete(&self, order_id: Uuid) -> Result<bool, StoreError> {
    Ok(self.orders.lock().remove(&order_id).is_some())
  }

  async fn set_transaction_id(&self, order_id: Uuid, transaction_id: &str) -> Result<bool, StoreError> {
    let mut orders = self.orders.lock();
    Ok(match orders.get_mut(&order_id) {
      Some(order) => {
        order.payment.transaction_id = Some(transaction_id.to_string());
        order.updated_at = chrono::Utc::now();
        true
      }
      None => false,
    })
  }

  async fn transition(&self, order_id: Uuid, transition: &OrderTransition) -> Result<bool, StoreError> {
    Ok(
      self
        .orders
        .lock()
        .get_mut(&order_id)
        .map_or(false, |order| order.apply(transition)),
    )
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn remove_items(&self, user_id: Uuid, keys: &[CartLineKey]) -> Result<usize, StoreError> {
    let mut carts = self.carts.lock();
    let Some(items) = carts.get_mut(&user_id) else {
      return Ok(0);
    };
    let before = items.len();
    items.retain(|item| !keys.contains(&item.key()));
    Ok(before - items.len())
  }
}
