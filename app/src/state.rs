// src/state.rs

use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::{CatalogLookup, GeoProvider, InventoryUpdater, PaymentGateway, ShippingEstimator};
use crate::store::{CartStore, CatalogStore, OrderStore};
use stepline::Stepline;

/// The three persistence seams, possibly backed by one store.
#[derive(Clone)]
pub struct Stores {
  pub catalog: Arc<dyn CatalogStore>,
  pub orders: Arc<dyn OrderStore>,
  pub carts: Arc<dyn CartStore>,
}

impl Stores {
  pub fn shared<S>(store: Arc<S>) -> Self
  where
    S: CatalogStore + OrderStore + CartStore + 'static,
  {
    Self {
      catalog: store.clone(),
      orders: store.clone(),
      carts: store,
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub stepline: Arc<Stepline<AppError>>,

  pub catalog: CatalogLookup,
  pub shipping: ShippingEstimator,
  pub gateway: Arc<dyn PaymentGateway>,
  pub inventory: InventoryUpdater,
  pub orders: Arc<dyn OrderStore>,
  pub carts: Arc<dyn CartStore>,
}

impl AppState {
  /// Wires the components together and registers every workflow pipeline.
  pub fn new(config: AppConfig, stores: Stores, geo: Arc<dyn GeoProvider>, gateway: Arc<dyn PaymentGateway>) -> Self {
    let shipping = ShippingEstimator::new(geo, config.tariff.clone(), config.geo.origin_address.clone());
    let stepline = Arc::new(Stepline::<AppError>::new());
    pipelines::register_all_pipelines(&stepline);

    Self {
      config: Arc::new(config),
      stepline,
      catalog: CatalogLookup::new(stores.catalog.clone()),
      shipping,
      gateway,
      inventory: InventoryUpdater::new(stores.catalog),
      orders: stores.orders,
      carts: stores.carts,
    }
  }
}
