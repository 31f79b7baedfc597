// src/services/goong.rs

//! Goong Maps REST client.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::shipping::{Coordinates, GeoProvider, ShippingError};
use crate::config::GeoConfig;

#[derive(Debug, Clone)]
pub struct GoongClient {
  config: GeoConfig,
  http: Client,
}

impl GoongClient {
  pub fn new(config: GeoConfig) -> Result<Self, reqwest::Error> {
    let http = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { config, http })
  }

  async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, ShippingError> {
    let url = format!("{}/{}", self.config.api_base.trim_end_matches('/'), path);
    let response = self
      .http
      .get(&url)
      .query(query)
      .query(&[("api_key", self.config.api_key.as_str())])
      .send()
      .await
      .map_err(|e| ShippingError::ProviderFailure(format!("{} request failed: {}", path, e)))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      warn!(%status, path, "Goong rejected the API key.");
      return Err(ShippingError::ProviderAuth);
    }
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      return Err(ShippingError::ProviderFailure(format!(
        "{} failed with status {}: {}",
        path, status, text
      )));
    }
    Ok(response)
  }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
  #[serde(default)]
  results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
  geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
  location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
  lat: f64,
  lng: f64,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
  #[serde(default)]
  rows: Vec<MatrixRow>,
  status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
  #[serde(default)]
  elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
  status: String,
  distance: Option<MatrixDistance>,
}

#[derive(Debug, Deserialize)]
struct MatrixDistance {
  /// Metres.
  value: f64,
}

#[async_trait]
impl GeoProvider for GoongClient {
  async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, ShippingError> {
    let body: GeocodeResponse = self
      .get("Geocode", &[("address", address)])
      .await?
      .json()
      .await
      .map_err(|e| ShippingError::ProviderFailure(format!("unreadable geocode response: {}", e)))?;

    let found = body.results.into_iter().next().map(|r| Coordinates {
      lat: r.geometry.location.lat,
      lng: r.geometry.location.lng,
    });
    if found.is_none() {
      debug!(address, "Geocoding returned no results.");
    }
    Ok(found)
  }

  async fn road_distance_km(&self, from: Coordinates, to: Coordinates) -> Result<f64, ShippingError> {
    let origins = format!("{},{}", from.lat, from.lng);
    let destinations = format!("{},{}", to.lat, to.lng);
    let body: DistanceMatrixResponse = self
      .get(
        "DistanceMatrix",
        &[
          ("origins", origins.as_str()),
          ("destinations", destinations.as_str()),
          ("vehicle", "car"),
        ],
      )
      .await?
      .json()
      .await
      .map_err(|e| ShippingError::ProviderFailure(format!("unreadable distance matrix response: {}", e)))?;

    let element = body.rows.into_iter().next().and_then(|r| r.elements.into_iter().next());
    match element {
      Some(MatrixElement {
        status,
        distance: Some(distance),
      }) if status == "OK" => Ok(distance.value / 1000.0),
      Some(MatrixElement { status, .. }) => Err(element_status_error(&status)),
      None => Err(element_status_error(body.status.as_deref().unwrap_or("UNKNOWN_ERROR"))),
    }
  }
}

fn element_status_error(status: &str) -> ShippingError {
  match status {
    "ZERO_RESULTS" => ShippingError::RouteUnavailable,
    "MAX_ROUTE_LENGTH_EXCEEDED" => ShippingError::DistanceTooLarge,
    other => ShippingError::ProviderFailure(format!("distance matrix status {}", other)),
  }
}
