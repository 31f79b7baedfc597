// src/services/shipping.rs

//! Distance-based shipping fees.

use actix_web::http::StatusCode;
use async_trait::async_trait;
use futures_util::future::try_join;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::ShippingTariff;

#[derive(Debug, Error)]
pub enum ShippingError {
  #[error("Could not locate address: {0}")]
  AddressUnresolvable(String),

  #[error("No road route exists between the two addresses")]
  RouteUnavailable,

  #[error("The distance is too large to deliver")]
  DistanceTooLarge,

  #[error("Map provider rejected the credentials")]
  ProviderAuth,

  #[error("Map provider failure: {0}")]
  ProviderFailure(String),
}

impl ShippingError {
  pub fn kind(&self) -> &'static str {
    match self {
      ShippingError::AddressUnresolvable(_) => "AddressUnresolvable",
      ShippingError::RouteUnavailable => "RouteUnavailable",
      ShippingError::DistanceTooLarge => "DistanceTooLarge",
      ShippingError::ProviderAuth => "ProviderAuthError",
      ShippingError::ProviderFailure(_) => "ShippingProviderError",
    }
  }

  /// Caused by the destination the client supplied rather than by the provider.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      ShippingError::AddressUnresolvable(_) | ShippingError::RouteUnavailable | ShippingError::DistanceTooLarge
    )
  }

  pub fn status_code(&self) -> StatusCode {
    match self {
      _ if self.is_client_error() => StatusCode::BAD_REQUEST,
      ShippingError::ProviderAuth => StatusCode::INTERNAL_SERVER_ERROR,
      _ => StatusCode::BAD_GATEWAY,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
  pub lat: f64,
  pub lng: f64,
}

/// Geocoding and road routing.
#[async_trait]
pub trait GeoProvider: Send + Sync {
  /// `None` when the provider has no match for the address.
  async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, ShippingError>;

  async fn road_distance_km(&self, from: Coordinates, to: Coordinates) -> Result<f64, ShippingError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingQuote {
  pub fee: i64,
  pub distance_km: f64,
}

/// Fee for a one-way delivery over `distance_km`.
pub fn shipping_fee(distance_km: f64, tariff: &ShippingTariff) -> i64 {
  if distance_km <= 0.0 {
    return 0;
  }
  if distance_km <= 1.0 {
    return tariff.first_tier_fee;
  }
  let raw = tariff.first_tier_fee as f64 + (distance_km - 1.0) * tariff.per_km_rate as f64;
  round_to_thousand(raw)
}

/// Surcharge applied when the parcel travels back to the warehouse.
pub fn return_leg_fee(fee: i64) -> i64 {
  round_to_thousand(fee as f64 * 1.5)
}

fn round_to_thousand(amount: f64) -> i64 {
  ((amount / 1000.0).round() as i64) * 1000
}

#[derive(Clone)]
pub struct ShippingEstimator {
  geo: Arc<dyn GeoProvider>,
  tariff: ShippingTariff,
  origin_address: String,
}

impl ShippingEstimator {
  pub fn new(geo: Arc<dyn GeoProvider>, tariff: ShippingTariff, origin_address: String) -> Self {
    Self {
      geo,
      tariff,
      origin_address,
    }
  }

  #[instrument(name = "shipping::estimate", skip(self), err(Display))]
  pub async fn estimate(&self, from_address: &str, to_address: &str, is_return_leg: bool) -> Result<ShippingQuote, ShippingError> {
    let (from, to) = try_join(self.locate(from_address), self.locate(to_address)).await?;
    let distance_km = self.geo.road_distance_km(from, to).await?;

    let mut fee = shipping_fee(distance_km, &self.tariff);
    if is_return_leg {
      fee = return_leg_fee(fee);
    }
    info!(distance_km, fee, "Shipping quote computed.");
    Ok(ShippingQuote { fee, distance_km })
  }

  /// Quote from the configured warehouse address.
  pub async fn quote_from_origin(&self, to_address: &str, is_return_leg: bool) -> Result<ShippingQuote, ShippingError> {
    self.estimate(&self.origin_address, to_address, is_return_leg).await
  }

  async fn locate(&self, address: &str) -> Result<Coordinates, ShippingError> {
    self
      .geo
      .geocode(address)
      .await?
      .ok_or_else(|| ShippingError::AddressUnresolvable(address.to_string()))
  }
}
