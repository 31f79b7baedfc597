// src/models/product.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
  pub url: String,
  #[serde(default)]
  pub is_primary: bool,
  pub order: Option<i32>,
  pub public_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
  pub id: Uuid,
  pub size: String,
  pub color: String,
  pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  #[serde(rename = "productId")]
  pub id: i64,
  pub name: String,
  pub price: i64,
  pub description: Option<String>,
  pub images: Vec<ProductImage>,
  pub variations: Vec<Variation>,
}

impl Product {
  /// Exact, case-sensitive match on size and color.
  pub fn find_variation(&self, size: &str, color: &str) -> Option<&Variation> {
    self.variations.iter().find(|v| v.size == size && v.color == color)
  }
}
