// src/models/cart_item.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub product_id: i64,
  pub size: String,
  pub color: String,
  pub quantity: i32,
}

/// Identifies a cart line by what was ordered, independent of quantity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartLineKey {
  pub product_id: i64,
  pub size: String,
  pub color: String,
}

impl CartItem {
  pub fn key(&self) -> CartLineKey {
    CartLineKey {
      product_id: self.product_id,
      size: self.size.clone(),
      color: self.color.clone(),
    }
  }
}
