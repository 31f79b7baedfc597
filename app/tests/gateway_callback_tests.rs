// tests/gateway_callback_tests.rs
mod common;

use common::*;
use serial_test::serial;
use uuid::Uuid;

use storefront::models::{Order, OrderStatus, OrderTransition, PaymentStatus};
use storefront::pipelines::contexts::{
  CheckoutCtxData, GatewayCancelCtxData, GatewayReturnCtxData, GatewayReturnOutcome,
};
use storefront::services::{AppliedDecrements, CaptureStatus};
use storefront::web::handlers::gateway_handlers::return_redirect_path;
use stepline::ContextData;

async fn place_gateway_order(h: &Harness, quantity: i64) -> Order {
  let ctx = ContextData::new(CheckoutCtxData::new(
    h.state.clone(),
    Uuid::new_v4(),
    checkout_body("Paypal", NEAR_ADDRESS, quantity),
  ));
  h.state.stepline.run(ctx.clone()).await.unwrap();
  let order = ctx.read().order.clone().unwrap();
  order
}

async fn success_callback(
  h: &Harness,
  token: Option<&str>,
  order_id: Option<String>,
) -> (Result<stepline::PipelineResult, storefront::errors::AppError>, Option<GatewayReturnOutcome>) {
  let ctx = ContextData::new(GatewayReturnCtxData::new(
    h.state.clone(),
    token.map(str::to_string),
    order_id,
  ));
  let result = h.state.stepline.run(ctx.clone()).await;
  let outcome = ctx.read().outcome.clone();
  (result, outcome)
}

async fn stored(h: &Harness, order_id: Uuid) -> Order {
  h.state.orders.find(order_id).await.unwrap().unwrap()
}

#[tokio::test]
#[serial]
async fn test_successful_capture_settles_order_and_takes_stock() {
  let h = harness();
  let order = place_gateway_order(&h, 3).await;
  let token = order.payment.transaction_id.clone().unwrap();

  let (result, outcome) = success_callback(&h, Some(&token), Some(order.id.to_string())).await;

  assert!(result.is_ok());
  assert_eq!(outcome, Some(GatewayReturnOutcome::Captured(order.id)));
  let settled = stored(&h, order.id).await;
  assert_eq!(settled.status, OrderStatus::Processing);
  assert_eq!(settled.payment.status, PaymentStatus::Completed);
  assert_eq!(settled.payment.transaction_id, Some(format!("CAPTURE-{}", token)));
  assert_eq!(h.store.variation_amount(TEE_ID, h.tee_black_m), Some(7));
  assert_eq!(
    return_redirect_path(&outcome.unwrap(), None),
    format!("/checkout/success?orderId={}", order.id)
  );
}

#[tokio::test]
#[serial]
async fn test_repeated_success_callback_has_no_further_effect() {
  let h = harness();
  let order = place_gateway_order(&h, 2).await;
  let token = order.payment.transaction_id.clone().unwrap();

  success_callback(&h, Some(&token), Some(order.id.to_string())).await.0.unwrap();
  let first = stored(&h, order.id).await;
  let (result, outcome) = success_callback(&h, Some(&token), Some(order.id.to_string())).await;

  assert!(result.is_ok());
  assert_eq!(outcome, Some(GatewayReturnOutcome::AlreadyProcessed(order.id)));
  assert_eq!(stored(&h, order.id).await, first);
  assert_eq!(h.gateway.capture_count(), 1);
  assert_eq!(h.store.variation_amount(TEE_ID, h.tee_black_m), Some(8));
  assert_eq!(
    return_redirect_path(&outcome.unwrap(), None),
    format!("/order-details/{}?status=already_processed", order.id)
  );
}

#[tokio::test]
#[serial]
async fn test_concurrent_success_callbacks_take_stock_once() {
  let h = harness();
  let order = place_gateway_order(&h, 4).await;
  let token = order.payment.transaction_id.clone().unwrap();

  let (a, b) = tokio::join!(
    success_callback(&h, Some(&token), Some(order.id.to_string())),
    success_callback(&h, Some(&token), Some(order.id.to_string())),
  );

  assert!(a.0.is_ok() && b.0.is_ok());
  assert_eq!(h.store.variation_amount(TEE_ID, h.tee_black_m), Some(6));
  assert_eq!(stored(&h, order.id).await.payment.status, PaymentStatus::Completed);
}

#[tokio::test]
#[serial]
async fn test_already_captured_intent_counts_as_settled() {
  let h = harness();
  h.gateway.set_capture_status(CaptureStatus::AlreadyCaptured);
  let order = place_gateway_order(&h, 1).await;
  let token = order.payment.transaction_id.clone().unwrap();

  let (_, outcome) = success_callback(&h, Some(&token), Some(order.id.to_string())).await;

  assert_eq!(outcome, Some(GatewayReturnOutcome::Captured(order.id)));
  assert_eq!(stored(&h, order.id).await.status, OrderStatus::Processing);
}

#[tokio::test]
#[serial]
async fn test_rejected_capture_cancels_order() {
  let h = harness();
  h.gateway.set_capture_status(CaptureStatus::Other("DECLINED".to_string()));
  let order = place_gateway_order(&h, 1).await;
  let token = order.payment.transaction_id.clone().unwrap();

  let (result, outcome) = success_callback(&h, Some(&token), Some(order.id.to_string())).await;

  assert!(result.is_ok());
  assert_eq!(outcome, Some(GatewayReturnOutcome::CaptureRejected(order.id)));
  let failed = stored(&h, order.id).await;
  assert_eq!(failed.status, OrderStatus::Cancelled);
  assert_eq!(failed.payment.status, PaymentStatus::Failed);
  assert_eq!(h.store.variation_amount(TEE_ID, h.tee_black_m), Some(10));
}

#[tokio::test]
#[serial]
async fn test_capture_error_marks_pending_order_failed() {
  let h = harness_with(FakeGateway::failing_capture());
  let order = place_gateway_order(&h, 1).await;
  let token = order.payment.transaction_id.clone().unwrap();

  let (result, _) = success_callback(&h, Some(&token), Some(order.id.to_string())).await;

  assert!(result.is_err());
  let failed = stored(&h, order.id).await;
  assert_eq!(failed.status, OrderStatus::Cancelled);
  assert_eq!(failed.payment.status, PaymentStatus::Failed);
}

#[tokio::test]
#[serial]
async fn test_malformed_or_unknown_callbacks_do_nothing() {
  let h = harness();

  let (_, outcome) = success_callback(&h, None, Some(Uuid::new_v4().to_string())).await;
  assert_eq!(outcome, Some(GatewayReturnOutcome::InvalidCallback));
  assert_eq!(
    return_redirect_path(&GatewayReturnOutcome::InvalidCallback, Some("not-a-uuid")),
    "/payment/error?message=InvalidCallbackData&orderId=unknown"
  );

  let (_, outcome) = success_callback(&h, Some("TOKEN"), Some("42".to_string())).await;
  assert_eq!(outcome, Some(GatewayReturnOutcome::InvalidCallback));

  let missing = Uuid::new_v4();
  let (_, outcome) = success_callback(&h, Some("TOKEN"), Some(missing.to_string())).await;
  assert_eq!(outcome, Some(GatewayReturnOutcome::OrderNotFound(missing)));
  assert_eq!(h.gateway.capture_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_cancel_callback_cancels_pending_and_ignores_settled() {
  let h = harness();
  let pending = place_gateway_order(&h, 1).await;
  let settled = place_gateway_order(&h, 1).await;
  let token = settled.payment.transaction_id.clone().unwrap();
  success_callback(&h, Some(&token), Some(settled.id.to_string())).await.0.unwrap();
  let settled_before = stored(&h, settled.id).await;

  for (order_id, expect_cancelled) in [(pending.id, true), (settled.id, false)] {
    let ctx = ContextData::new(GatewayCancelCtxData {
      app_state: h.state.clone(),
      raw_order_id: Some(order_id.to_string()),
      cancelled: false,
    });
    h.state.stepline.run(ctx.clone()).await.unwrap();
    assert_eq!(ctx.read().cancelled, expect_cancelled);
  }

  let cancelled = stored(&h, pending.id).await;
  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert_eq!(cancelled.payment.status, PaymentStatus::Cancelled);
  assert_eq!(stored(&h, settled.id).await, settled_before);
}

#[tokio::test]
#[serial]
async fn test_capture_records_applied_stock() {
  let h = harness();
  let order = place_gateway_order(&h, 2).await;
  let token = order.payment.transaction_id.clone().unwrap();

  let ctx = ContextData::new(GatewayReturnCtxData::new(
    h.state.clone(),
    Some(token),
    Some(order.id.to_string()),
  ));
  h.state.stepline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().stock, Some(AppliedDecrements { applied: 1, skipped: 0 }));
}

#[tokio::test]
#[serial]
async fn test_token_of_another_order_cannot_settle_an_order() {
  let h = harness();
  let paid = place_gateway_order(&h, 1).await;
  let unpaid = place_gateway_order(&h, 5).await;
  let paid_token = paid.payment.transaction_id.clone().unwrap();
  success_callback(&h, Some(&paid_token), Some(paid.id.to_string())).await.0.unwrap();
  assert_eq!(h.store.variation_amount(TEE_ID, h.tee_black_m), Some(9));

  // The gateway would report the reused intent as already captured.
  h.gateway.set_capture_status(CaptureStatus::AlreadyCaptured);
  let (result, outcome) = success_callback(&h, Some(&paid_token), Some(unpaid.id.to_string())).await;

  assert!(result.is_ok());
  assert_eq!(outcome, Some(GatewayReturnOutcome::InvalidCallback));
  let untouched = stored(&h, unpaid.id).await;
  assert_eq!(untouched.status, OrderStatus::Pending);
  assert_eq!(untouched.payment.status, PaymentStatus::Pending);
  assert_eq!(untouched.payment.transaction_id, unpaid.payment.transaction_id);
  assert_eq!(h.gateway.capture_count(), 1);
  assert_eq!(h.store.variation_amount(TEE_ID, h.tee_black_m), Some(9));
}

#[tokio::test]
#[serial]
async fn test_cash_order_cannot_be_settled_through_the_gateway() {
  let h = harness();
  let ctx = ContextData::new(CheckoutCtxData::new(
    h.state.clone(),
    Uuid::new_v4(),
    checkout_body("Cash", NEAR_ADDRESS, 1),
  ));
  h.state.stepline.run(ctx.clone()).await.unwrap();
  let cash_order = ctx.read().order.clone().unwrap();

  let (_, outcome) = success_callback(&h, Some("PAYPAL-forged"), Some(cash_order.id.to_string())).await;

  assert_eq!(outcome, Some(GatewayReturnOutcome::InvalidCallback));
  assert_eq!(stored(&h, cash_order.id).await, cash_order);
  assert_eq!(h.gateway.capture_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_rejected_capture_after_concurrent_cancel_reports_already_processed() {
  let h = harness();
  h.gateway.set_capture_status(CaptureStatus::Other("DECLINED".to_string()));
  let order = place_gateway_order(&h, 1).await;
  let token = order.payment.transaction_id.clone().unwrap();

  // The payer's cancel return lands while the capture is in flight.
  let orders = h.state.orders.clone();
  let order_id = order.id;
  h.gateway.run_during_capture(move || async move {
    assert!(orders.transition(order_id, &OrderTransition::cancel_pending()).await.unwrap());
  });

  let (result, outcome) = success_callback(&h, Some(&token), Some(order.id.to_string())).await;

  assert!(result.is_ok());
  assert_eq!(outcome, Some(GatewayReturnOutcome::AlreadyProcessed(order.id)));
  let cancelled = stored(&h, order.id).await;
  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert_eq!(cancelled.payment.status, PaymentStatus::Cancelled);
}
