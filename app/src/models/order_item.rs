// src/models/order_item.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart_item::CartLineKey;
use super::product::ProductImage;

/// A line of a placed order. Copied from the catalog at creation time and
/// never re-read from it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: i64,
  pub product_variation_id: Uuid,
  pub name: String,
  pub price: i64,
  pub quantity: i32,
  pub size: String,
  pub color: String,
  pub images: Vec<ProductImage>,
}

impl OrderItem {
  pub fn line_total(&self) -> i64 {
    self.price * i64::from(self.quantity)
  }

  pub fn cart_key(&self) -> CartLineKey {
    CartLineKey {
      product_id: self.product_id,
      size: self.size.clone(),
      color: self.color.clone(),
    }
  }
}
