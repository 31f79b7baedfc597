// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

use storefront::config::{AppConfig, GeoConfig, PayPalConfig, SettlementConfig, ShippingTariff};
use storefront::models::{Order, OrderTransition, Product, ProductImage, Variation};
use storefront::services::{
  CaptureOutcome, CaptureStatus, Coordinates, GatewayError, GeoProvider, IntentRequest, OpenedIntent, PaymentGateway,
  ShippingError,
};
use storefront::state::{AppState, Stores};
use storefront::store::{MemoryStore, OrderStore, StoreError};

pub const WAREHOUSE: &str = "Warehouse, Gò Vấp";
pub const NEAR_ADDRESS: &str = "12 Nearby Street";
pub const FAR_ADDRESS: &str = "99 Far Away Road";
pub const UNROUTABLE_ADDRESS: &str = "Island Without Roads";
/// The geo provider rejects its credentials for this destination.
pub const AUTH_REJECTED_ADDRESS: &str = "Revoked Key Lane";

pub const TEE_ID: i64 = 1;
pub const TEE_PRICE: i64 = 100_000;

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Known addresses with a fixed road distance from the warehouse.
pub struct FakeGeo {
  distances: HashMap<String, f64>,
  geocode_calls: AtomicUsize,
}

impl FakeGeo {
  pub fn new() -> Self {
    let mut distances = HashMap::new();
    distances.insert(WAREHOUSE.to_string(), 0.0);
    distances.insert(NEAR_ADDRESS.to_string(), 0.8);
    distances.insert(FAR_ADDRESS.to_string(), 12.26);
    distances.insert(UNROUTABLE_ADDRESS.to_string(), -1.0);
    Self {
      distances,
      geocode_calls: AtomicUsize::new(0),
    }
  }

  pub fn geocode_calls(&self) -> usize {
    self.geocode_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl GeoProvider for FakeGeo {
  async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, ShippingError> {
    self.geocode_calls.fetch_add(1, Ordering::SeqCst);
    if address == AUTH_REJECTED_ADDRESS {
      return Err(ShippingError::ProviderAuth);
    }
    // The latitude carries the distance so `road_distance_km` can read it back.
    Ok(self.distances.get(address).map(|d| Coordinates { lat: *d, lng: 106.0 }))
  }

  async fn road_distance_km(&self, _from: Coordinates, to: Coordinates) -> Result<f64, ShippingError> {
    if to.lat < 0.0 {
      return Err(ShippingError::RouteUnavailable);
    }
    Ok(to.lat)
  }
}

/// Scriptable gateway that records every call.
pub struct FakeGateway {
  pub fail_open: bool,
  pub capture_status: Mutex<CaptureStatus>,
  pub fail_capture: bool,
  pub opened: Mutex<Vec<IntentRequest>>,
  pub captures: AtomicUsize,
  during_capture: Mutex<Option<CaptureHook>>,
}

type CaptureHook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

impl FakeGateway {
  pub fn new() -> Self {
    Self {
      fail_open: false,
      capture_status: Mutex::new(CaptureStatus::Completed),
      fail_capture: false,
      opened: Mutex::new(Vec::new()),
      captures: AtomicUsize::new(0),
      during_capture: Mutex::new(None),
    }
  }

  pub fn failing_open() -> Self {
    Self {
      fail_open: true,
      ..Self::new()
    }
  }

  pub fn failing_capture() -> Self {
    Self {
      fail_capture: true,
      ..Self::new()
    }
  }

  pub fn set_capture_status(&self, status: CaptureStatus) {
    *self.capture_status.lock() = status;
  }

  /// Runs `hook` once, inside the next capture call, before it answers.
  pub fn run_during_capture<F, Fut>(&self, hook: F)
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    *self.during_capture.lock() = Some(Box::new(move || Box::pin(hook())));
  }

  pub fn capture_count(&self) -> usize {
    self.captures.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn obtain_access_token(&self) -> Result<String, GatewayError> {
    Ok("test-token".to_string())
  }

  async fn open_intent(&self, request: &IntentRequest) -> Result<OpenedIntent, GatewayError> {
    if self.fail_open {
      return Err(GatewayError::IntentCreationFailed("sandbox unavailable".to_string()));
    }
    self.opened.lock().push(request.clone());
    let provider_intent_id = format!("PAYPAL-{}", request.order_id.simple());
    Ok(OpenedIntent {
      approval_url: format!("https://gateway.test/checkoutnow?token={}", provider_intent_id),
      provider_intent_id,
    })
  }

  async fn capture_intent(&self, provider_intent_id: &str) -> Result<CaptureOutcome, GatewayError> {
    self.captures.fetch_add(1, Ordering::SeqCst);
    let hook = self.during_capture.lock().take();
    if let Some(hook) = hook {
      hook().await;
    }
    if self.fail_capture {
      return Err(GatewayError::CaptureFailed("gateway timeout".to_string()));
    }
    Ok(CaptureOutcome {
      status: self.capture_status.lock().clone(),
      provider_transaction_id: format!("CAPTURE-{}", provider_intent_id),
    })
  }
}

/// Order store whose deletes always fail; everything else goes to the memory store.
pub struct UndeletableOrders(pub Arc<MemoryStore>);

#[async_trait]
impl OrderStore for UndeletableOrders {
  async fn insert(&self, order: &Order) -> Result<(), StoreError> {
    self.0.insert(order).await
  }

  async fn find(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    self.0.find(order_id).await
  }

  async fn find_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
    self.0.find_for_user(order_id, user_id).await
  }

  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
    self.0.list_by_user(user_id).await
  }

  async fn delete(&self, _order_id: Uuid) -> Result<bool, StoreError> {
    Err(StoreError::Unavailable("connection reset during delete".to_string()))
  }

  async fn set_transaction_id(&self, order_id: Uuid, transaction_id: &str) -> Result<bool, StoreError> {
    self.0.set_transaction_id(order_id, transaction_id).await
  }

  async fn transition(&self, order_id: Uuid, transition: &OrderTransition) -> Result<bool, StoreError> {
    self.0.transition(order_id, transition).await
  }
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    app_base_url: "http://api.test".to_string(),
    frontend_base_url: "http://shop.test".to_string(),
    database_url: None,
    seed_demo_catalog: false,
    geo: GeoConfig {
      api_key: "geo-key".to_string(),
      api_base: "http://geo.test".to_string(),
      origin_address: WAREHOUSE.to_string(),
      timeout: Duration::from_secs(1),
    },
    paypal: PayPalConfig {
      client_id: "client".to_string(),
      client_secret: "secret".to_string(),
      api_base: "http://gateway.test".to_string(),
      brand_name: "Storefront Test".to_string(),
      timeout: Duration::from_secs(1),
    },
    settlement: SettlementConfig {
      currency: "USD".to_string(),
      exchange_rate: Decimal::from(23_000),
    },
    tariff: ShippingTariff::default(),
  }
}

/// Everything a test needs to drive the workflow and inspect its effects.
pub struct Harness {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub geo: Arc<FakeGeo>,
  pub gateway: Arc<FakeGateway>,
  pub tee_black_m: Uuid,
  pub tee_white_m: Uuid,
}

fn build_harness(gateway: FakeGateway, undeletable_orders: bool) -> Harness {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let tee_black_m = Uuid::new_v4();
  let tee_white_m = Uuid::new_v4();
  store.upsert_product(Product {
    id: TEE_ID,
    name: "Basic tee".to_string(),
    price: TEE_PRICE,
    description: None,
    images: vec![ProductImage {
      url: "https://cdn.test/tee.jpg".to_string(),
      is_primary: true,
      order: Some(1),
      public_id: None,
    }],
    variations: vec![
      Variation {
        id: tee_black_m,
        size: "M".to_string(),
        color: "Black".to_string(),
        amount: 10,
      },
      Variation {
        id: tee_white_m,
        size: "M".to_string(),
        color: "White".to_string(),
        amount: 1,
      },
    ],
  });

  let geo = Arc::new(FakeGeo::new());
  let gateway = Arc::new(gateway);
  let mut stores = Stores::shared(store.clone());
  if undeletable_orders {
    stores.orders = Arc::new(UndeletableOrders(store.clone()));
  }
  let state = AppState::new(test_config(), stores, geo.clone(), gateway.clone());
  Harness {
    state,
    store,
    geo,
    gateway,
    tee_black_m,
    tee_white_m,
  }
}

pub fn harness_with(gateway: FakeGateway) -> Harness {
  build_harness(gateway, false)
}

/// Harness whose order deletes fail, so compensating deletes cannot succeed.
pub fn harness_with_undeletable_orders(gateway: FakeGateway) -> Harness {
  build_harness(gateway, true)
}

pub fn harness() -> Harness {
  harness_with(FakeGateway::new())
}

pub fn checkout_body(payment_method: &str, address: &str, quantity: i64) -> serde_json::Value {
  serde_json::json!({
    "customerName": "Nguyễn Lan",
    "customerPhone": "0900000000",
    "toAddress": address,
    "paymentMethod": payment_method,
    "items": [{"productId": TEE_ID, "quantity": quantity, "size": "M", "color": "Black"}],
  })
}
