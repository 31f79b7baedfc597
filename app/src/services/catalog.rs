// src/services/catalog.rs

use futures_util::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Product, Variation};
use crate::store::{CatalogStore, StoreError};

/// Business reasons a requested line cannot be fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
  #[error("product {product_id} not found")]
  NotFound { product_id: i64 },

  #[error("product {product_id} has no variation with size '{size}' and color '{color}'")]
  VariationNotFound { product_id: i64, size: String, color: String },

  #[error("not enough stock for '{name}' ({size}/{color}): {available} available, {requested} requested")]
  InsufficientStock {
    product_id: i64,
    name: String,
    size: String,
    color: String,
    available: i32,
    requested: i32,
  },
}

/// A lookup failure tagged with the index of the request line it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemError {
  pub line: usize,
  pub error: LookupError,
}

impl fmt::Display for LineItemError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Item {}: {}", self.line + 1, self.error)
  }
}

/// One requested line of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
  pub product_id: i64,
  pub size: String,
  pub color: String,
  pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct ResolvedLine {
  pub product: Product,
  pub variation: Variation,
  pub quantity: i32,
}

/// Read-only verification of requested lines against the catalog.
#[derive(Clone)]
pub struct CatalogLookup {
  store: Arc<dyn CatalogStore>,
}

impl CatalogLookup {
  pub fn new(store: Arc<dyn CatalogStore>) -> Self {
    Self { store }
  }

  /// Resolves one line. The outer error is infrastructure, the inner one is business.
  #[instrument(name = "catalog::resolve", skip(self), fields(product_id = line.product_id))]
  pub async fn resolve(&self, line: &LineRequest) -> std::result::Result<std::result::Result<ResolvedLine, LookupError>, StoreError> {
    let Some(product) = self.store.find_product(line.product_id).await? else {
      return Ok(Err(LookupError::NotFound {
        product_id: line.product_id,
      }));
    };

    let Some(variation) = product.find_variation(&line.size, &line.color).cloned() else {
      return Ok(Err(LookupError::VariationNotFound {
        product_id: line.product_id,
        size: line.size.clone(),
        color: line.color.clone(),
      }));
    };

    if variation.amount < line.quantity {
      return Ok(Err(LookupError::InsufficientStock {
        product_id: product.id,
        name: product.name.clone(),
        size: variation.size.clone(),
        color: variation.color.clone(),
        available: variation.amount,
        requested: line.quantity,
      }));
    }

    Ok(Ok(ResolvedLine {
      product,
      variation,
      quantity: line.quantity,
    }))
  }

  /// Resolves every line concurrently. Business failures are collected, in
  /// request order, into a single `AppError::LineItems`. Lines naming the same
  /// variation draw on the same stock, so their quantities are summed.
  #[instrument(name = "catalog::resolve_all", skip(self, lines), fields(lines = lines.len()))]
  pub async fn resolve_all(&self, lines: &[LineRequest]) -> Result<Vec<ResolvedLine>> {
    let outcomes = join_all(lines.iter().map(|line| self.resolve(line))).await;

    let mut resolved = Vec::with_capacity(lines.len());
    let mut failures = Vec::new();
    let mut requested_so_far: HashMap<Uuid, i32> = HashMap::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
      match outcome? {
        Ok(line) => {
          let total = requested_so_far.entry(line.variation.id).or_insert(0);
          *total += line.quantity;
          if *total > line.variation.amount {
            failures.push(LineItemError {
              line: index,
              error: LookupError::InsufficientStock {
                product_id: line.product.id,
                name: line.product.name.clone(),
                size: line.variation.size.clone(),
                color: line.variation.color.clone(),
                available: line.variation.amount,
                requested: *total,
              },
            });
          } else {
            resolved.push(line);
          }
        }
        Err(error) => failures.push(LineItemError { line: index, error }),
      }
    }

    if !failures.is_empty() {
      debug!(failed = failures.len(), "Line item verification failed.");
      return Err(AppError::LineItems(failures));
    }
    Ok(resolved)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.upsert_product(Product {
      id: 7,
      name: "Hoodie".to_string(),
      price: 250_000,
      description: None,
      images: vec![],
      variations: vec![Variation {
        id: Uuid::new_v4(),
        size: "L".to_string(),
        color: "Gray".to_string(),
        amount: 2,
      }],
    });
    store
  }

  fn line(product_id: i64, size: &str, color: &str, quantity: i32) -> LineRequest {
    LineRequest {
      product_id,
      size: size.to_string(),
      color: color.to_string(),
      quantity,
    }
  }

  #[tokio::test]
  async fn resolve_distinguishes_failure_reasons() {
    let lookup = CatalogLookup::new(store());

    let ok = lookup.resolve(&line(7, "L", "Gray", 2)).await.unwrap().unwrap();
    assert_eq!(ok.variation.amount, 2);

    assert_eq!(
      lookup.resolve(&line(8, "L", "Gray", 1)).await.unwrap().unwrap_err(),
      LookupError::NotFound { product_id: 8 }
    );
    assert!(matches!(
      lookup.resolve(&line(7, "l", "Gray", 1)).await.unwrap().unwrap_err(),
      LookupError::VariationNotFound { .. }
    ));
    assert!(matches!(
      lookup.resolve(&line(7, "L", "Gray", 3)).await.unwrap().unwrap_err(),
      LookupError::InsufficientStock {
        available: 2,
        requested: 3,
        ..
      }
    ));
  }

  #[tokio::test]
  async fn resolve_all_aggregates_in_request_order() {
    let lookup = CatalogLookup::new(store());
    let lines = vec![line(7, "L", "Gray", 1), line(99, "M", "Red", 1), line(7, "L", "Gray", 5)];

    let err = lookup.resolve_all(&lines).await.unwrap_err();
    let AppError::LineItems(failures) = err else {
      panic!("expected aggregated line item errors, got {:?}", err);
    };
    assert_eq!(failures.iter().map(|f| f.line).collect::<Vec<_>>(), vec![1, 2]);
    assert!(failures[0].to_string().starts_with("Item 2:"));
  }

  #[tokio::test]
  async fn resolve_all_sums_lines_sharing_a_variation() {
    let lookup = CatalogLookup::new(store());

    let resolved = lookup
      .resolve_all(&[line(7, "L", "Gray", 1), line(7, "L", "Gray", 1)])
      .await
      .unwrap();
    assert_eq!(resolved.len(), 2);

    let err = lookup
      .resolve_all(&[line(7, "L", "Gray", 2), line(7, "L", "Gray", 1)])
      .await
      .unwrap_err();
    let AppError::LineItems(failures) = err else {
      panic!("expected aggregated line item errors, got {:?}", err);
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].line, 1);
    assert!(matches!(
      failures[0].error,
      LookupError::InsufficientStock {
        available: 2,
        requested: 3,
        ..
      }
    ));
  }
}
