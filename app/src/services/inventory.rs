// src/services/inventory.rs

use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::models::OrderItem;
use crate::store::{CatalogStore, StockDecrement};

/// A requested decrement before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
  pub product_id: i64,
  pub variation_id: Option<Uuid>,
  pub quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedDecrements {
  pub applied: usize,
  pub skipped: usize,
}

/// Applies stock decrements after an order commits. Never fails the caller:
/// anything that does not apply is logged as a soft inconsistency.
#[derive(Clone)]
pub struct InventoryUpdater {
  store: Arc<dyn CatalogStore>,
}

impl InventoryUpdater {
  pub fn new(store: Arc<dyn CatalogStore>) -> Self {
    Self { store }
  }

  #[instrument(name = "inventory::apply_decrements", skip(self, lines), fields(lines = lines.len()))]
  pub async fn apply_decrements(&self, lines: &[StockLine]) -> AppliedDecrements {
    let mut outcome = AppliedDecrements::default();

    let batch: Vec<StockDecrement> = lines
      .iter()
      .filter_map(|line| match line.variation_id {
        Some(variation_id) if line.quantity > 0 => Some(StockDecrement {
          product_id: line.product_id,
          variation_id,
          quantity: line.quantity,
        }),
        _ => {
          warn!(product_id = line.product_id, quantity = line.quantity, "Skipping invalid stock line.");
          outcome.skipped += 1;
          None
        }
      })
      .collect();

    if batch.is_empty() {
      return outcome;
    }

    match self.store.decrement_stock(&batch).await {
      Ok(results) => {
        for (decrement, applied) in batch.iter().zip(results) {
          if applied {
            outcome.applied += 1;
          } else {
            outcome.skipped += 1;
            warn!(
              product_id = decrement.product_id,
              variation_id = %decrement.variation_id,
              quantity = decrement.quantity,
              "Stock decrement not applied: variation missing or stock too low."
            );
          }
        }
      }
      Err(e) => {
        outcome.skipped += batch.len();
        error!(error = %e, "Stock decrement batch failed; stock is now inconsistent with orders.");
      }
    }

    info!(applied = outcome.applied, skipped = outcome.skipped, "Stock decrements processed.");
    outcome
  }

  /// Decrements stock for the lines of a stored order. The owning product of
  /// each line is looked up by its variation id first.
  #[instrument(name = "inventory::apply_for_order_items", skip(self, items), fields(items = items.len()))]
  pub async fn apply_for_order_items(&self, items: &[OrderItem]) -> AppliedDecrements {
    let owners = join_all(
      items
        .iter()
        .map(|item| self.store.find_product_by_variation(item.product_variation_id)),
    )
    .await;

    let mut unresolved = 0;
    let lines: Vec<StockLine> = items
      .iter()
      .zip(owners)
      .filter_map(|(item, owner)| match owner {
        Ok(Some(product_id)) => Some(StockLine {
          product_id,
          variation_id: Some(item.product_variation_id),
          quantity: item.quantity,
        }),
        Ok(None) => {
          warn!(variation_id = %item.product_variation_id, "No product owns this variation any more.");
          unresolved += 1;
          None
        }
        Err(e) => {
          error!(error = %e, variation_id = %item.product_variation_id, "Failed to resolve owning product.");
          unresolved += 1;
          None
        }
      })
      .collect();

    let mut outcome = self.apply_decrements(&lines).await;
    outcome.skipped += unresolved;
    outcome
  }
}
