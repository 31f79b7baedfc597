// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use uuid::Uuid;

use super::order_item::OrderItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Cancelled,
}

impl PaymentStatus {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, PaymentStatus::Pending)
  }
}

/// Closed set of settlement methods accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "snake_case")]
pub enum PaymentMethod {
  Cash,
  #[serde(rename = "Paypal", alias = "ExternalGateway")]
  ExternalGateway,
}

impl PaymentMethod {
  pub const ACCEPTED: [&'static str; 2] = ["Cash", "Paypal"];

  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "Cash" => Some(PaymentMethod::Cash),
      "Paypal" | "ExternalGateway" => Some(PaymentMethod::ExternalGateway),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
  pub method: PaymentMethod,
  pub transaction_id: Option<String>,
  pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  pub full_name: String,
  pub phone: String,
  pub address: String,
  /// Road distance in kilometres.
  pub distance: f64,
  pub shipping_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub items: Vec<OrderItem>,
  pub total_price: i64,
  pub status: OrderStatus,
  pub payment: PaymentInfo,
  pub shipping_address: ShippingAddress,
  pub note: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// Builds a new order in `Pending`/`Pending`, with the total computed from
  /// the line snapshots and the shipping fee.
  pub fn new_pending(
    user_id: Uuid,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    method: PaymentMethod,
    note: String,
  ) -> Self {
    let now = Utc::now();
    let mut order = Self {
      id: Uuid::new_v4(),
      user_id,
      items,
      total_price: 0,
      status: OrderStatus::Pending,
      payment: PaymentInfo {
        method,
        transaction_id: None,
        status: PaymentStatus::Pending,
      },
      shipping_address,
      note,
      created_at: now,
      updated_at: now,
    };
    order.total_price = order.recomputed_total();
    order
  }

  pub fn subtotal(&self) -> i64 {
    self.items.iter().map(OrderItem::line_total).sum()
  }

  pub fn recomputed_total(&self) -> i64 {
    self.subtotal() + self.shipping_address.shipping_fee
  }

  /// Neither the order nor its payment has left `Pending`.
  pub fn is_awaiting_payment(&self) -> bool {
    self.status == OrderStatus::Pending && self.payment.status == PaymentStatus::Pending
  }

  /// Applies `transition` if its guard matches. Returns whether it did.
  pub fn apply(&mut self, transition: &OrderTransition) -> bool {
    if !transition.matches(self) {
      return false;
    }
    self.status = transition.new_status;
    if let Some(payment_status) = transition.new_payment_status {
      self.payment.status = payment_status;
    }
    if let Some(transaction_id) = &transition.transaction_id {
      self.payment.transaction_id = Some(transaction_id.clone());
    }
    self.updated_at = Utc::now();
    true
  }
}

/// A guarded state change: applied only while the order is still in the
/// expected state, so concurrent or repeated callbacks cannot move a
/// terminal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTransition {
  pub expected_status: OrderStatus,
  pub expected_payment_status: PaymentStatus,
  pub new_status: OrderStatus,
  pub new_payment_status: Option<PaymentStatus>,
  pub transaction_id: Option<String>,
}

impl OrderTransition {
  /// Gateway confirmed the capture: fulfilment can start.
  pub fn capture_completed(transaction_id: String) -> Self {
    Self {
      expected_status: OrderStatus::Pending,
      expected_payment_status: PaymentStatus::Pending,
      new_status: OrderStatus::Processing,
      new_payment_status: Some(PaymentStatus::Completed),
      transaction_id: Some(transaction_id),
    }
  }

  /// Capture rejected or callback processing failed.
  pub fn payment_failed() -> Self {
    Self {
      expected_status: OrderStatus::Pending,
      expected_payment_status: PaymentStatus::Pending,
      new_status: OrderStatus::Cancelled,
      new_payment_status: Some(PaymentStatus::Failed),
      transaction_id: None,
    }
  }

  /// Payer abandoned the gateway, or the owner cancelled before settlement.
  pub fn cancel_pending() -> Self {
    Self {
      expected_status: OrderStatus::Pending,
      expected_payment_status: PaymentStatus::Pending,
      new_status: OrderStatus::Cancelled,
      new_payment_status: Some(PaymentStatus::Cancelled),
      transaction_id: None,
    }
  }

  pub fn matches(&self, order: &Order) -> bool {
    order.status == self.expected_status && order.payment.status == self.expected_payment_status
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(price: i64, quantity: i32) -> OrderItem {
    OrderItem {
      product_id: 1,
      product_variation_id: Uuid::new_v4(),
      name: "Tee".to_string(),
      price,
      quantity,
      size: "M".to_string(),
      color: "Black".to_string(),
      images: vec![],
    }
  }

  fn address(fee: i64) -> ShippingAddress {
    ShippingAddress {
      full_name: "Lan".to_string(),
      phone: "0900000000".to_string(),
      address: "1 Lê Lợi".to_string(),
      distance: 3.2,
      shipping_fee: fee,
    }
  }

  #[test]
  fn new_pending_total_includes_shipping() {
    let order = Order::new_pending(
      Uuid::new_v4(),
      vec![item(100_000, 2), item(50_000, 1)],
      address(15_000),
      PaymentMethod::Cash,
      String::new(),
    );
    assert_eq!(order.total_price, 265_000);
    assert_eq!(order.total_price, order.recomputed_total());
    assert!(order.is_awaiting_payment());
  }

  #[test]
  fn terminal_payment_never_reverts() {
    let mut order = Order::new_pending(Uuid::new_v4(), vec![item(1, 1)], address(0), PaymentMethod::ExternalGateway, String::new());
    assert!(order.apply(&OrderTransition::capture_completed("CAP-1".to_string())));
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment.transaction_id.as_deref(), Some("CAP-1"));

    assert!(!order.apply(&OrderTransition::payment_failed()));
    assert!(!order.apply(&OrderTransition::cancel_pending()));
    assert_eq!(order.payment.status, PaymentStatus::Completed);
  }

  #[test]
  fn payment_method_wire_names() {
    assert_eq!(serde_json::to_string(&PaymentMethod::ExternalGateway).unwrap(), "\"Paypal\"");
    let parsed: PaymentMethod = serde_json::from_str("\"ExternalGateway\"").unwrap();
    assert_eq!(parsed, PaymentMethod::ExternalGateway);
    assert_eq!(PaymentMethod::parse("cash"), None);
  }
}
