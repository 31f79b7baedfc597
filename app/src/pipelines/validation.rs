// src/pipelines/validation.rs

//! Structural validation of a raw checkout body. Every violation is collected.

use serde_json::{Map, Value};

use crate::models::PaymentMethod;
use crate::services::LineRequest;

/// A checkout request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutInput {
  pub customer_name: String,
  pub customer_phone: String,
  pub to_address: String,
  pub payment_method: PaymentMethod,
  pub items: Vec<LineRequest>,
  pub note: String,
  pub is_return: bool,
}

fn non_empty_str<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
  body.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

pub fn validate_checkout_request(raw: &Value) -> Result<CheckoutInput, Vec<String>> {
  let Some(body) = raw.as_object() else {
    return Err(vec!["Request body must be a JSON object.".to_string()]);
  };
  let mut violations = Vec::new();

  let customer_name = non_empty_str(body, "customerName");
  if customer_name.is_none() {
    violations.push("Missing customer name.".to_string());
  }
  let customer_phone = non_empty_str(body, "customerPhone");
  if customer_phone.is_none() {
    violations.push("Missing customer phone number.".to_string());
  }
  let to_address = non_empty_str(body, "toAddress");
  if to_address.is_none() {
    violations.push("Missing delivery address.".to_string());
  }

  let payment_method = match non_empty_str(body, "paymentMethod") {
    None => {
      violations.push("Missing payment method.".to_string());
      None
    }
    Some(raw_method) => {
      let parsed = PaymentMethod::parse(raw_method);
      if parsed.is_none() {
        violations.push(format!(
          "Invalid payment method. Accepted: {}.",
          PaymentMethod::ACCEPTED.join(", ")
        ));
      }
      parsed
    }
  };

  let mut items = Vec::new();
  match body.get("items").and_then(Value::as_array) {
    Some(raw_items) if !raw_items.is_empty() => {
      for (index, raw_item) in raw_items.iter().enumerate() {
        if let Some(line) = validate_item(index, raw_item, &mut violations) {
          items.push(line);
        }
      }
    }
    _ => violations.push("Item list is missing or empty.".to_string()),
  }

  let note = body.get("note").and_then(Value::as_str).unwrap_or_default().to_string();
  let is_return = body.get("isReturn").and_then(Value::as_bool).unwrap_or(false);

  match (customer_name, customer_phone, to_address, payment_method) {
    (Some(name), Some(phone), Some(address), Some(method)) if violations.is_empty() => Ok(CheckoutInput {
      customer_name: name.to_string(),
      customer_phone: phone.to_string(),
      to_address: address.to_string(),
      payment_method: method,
      items,
      note,
      is_return,
    }),
    _ => Err(violations),
  }
}

fn validate_item(index: usize, raw: &Value, violations: &mut Vec<String>) -> Option<LineRequest> {
  let label = format!("Item {}", index + 1);
  let before = violations.len();

  let product_id = raw.get("productId").and_then(Value::as_i64).filter(|id| *id > 0);
  if product_id.is_none() {
    violations.push(format!("{}: missing or malformed productId.", label));
  }
  let quantity = raw
    .get("quantity")
    .and_then(Value::as_i64)
    .filter(|q| *q > 0)
    .and_then(|q| i32::try_from(q).ok());
  if quantity.is_none() {
    violations.push(format!("{}: quantity must be a positive integer.", label));
  }
  let size = raw.get("size").and_then(Value::as_str).filter(|s| !s.is_empty());
  if size.is_none() {
    violations.push(format!("{}: missing or malformed 'size'.", label));
  }
  let color = raw.get("color").and_then(Value::as_str).filter(|s| !s.is_empty());
  if color.is_none() {
    violations.push(format!("{}: missing or malformed 'color'.", label));
  }

  if violations.len() > before {
    return None;
  }
  Some(LineRequest {
    product_id: product_id?,
    size: size?.to_string(),
    color: color?.to_string(),
    quantity: quantity?,
  })
}
