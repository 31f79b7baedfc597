// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ORIGIN_ADDRESS: &str = "Số 12 Nguyễn Văn Bảo, Phường 4, Gò Vấp, Thành phố Hồ Chí Minh";

/// Fee schedule for road deliveries, in whole units of the local currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingTariff {
  pub first_tier_fee: i64,
  pub per_km_rate: i64,
}

impl Default for ShippingTariff {
  fn default() -> Self {
    Self {
      first_tier_fee: 15_000,
      per_km_rate: 2_000,
    }
  }
}

#[derive(Debug, Clone)]
pub struct GeoConfig {
  pub api_key: String,
  pub api_base: String,
  pub origin_address: String,
  pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PayPalConfig {
  pub client_id: String,
  pub client_secret: String,
  pub api_base: String,
  pub brand_name: String,
  pub timeout: Duration,
}

/// How a local-currency total is converted into the gateway's settlement currency.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
  pub currency: String,
  /// Units of local currency per one unit of settlement currency.
  pub exchange_rate: Decimal,
}

impl Default for SettlementConfig {
  fn default() -> Self {
    Self {
      currency: "USD".to_string(),
      exchange_rate: Decimal::from(23_000),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Public base URL of this service, used to build gateway callback URLs.
  pub app_base_url: String,
  /// Base URL of the storefront frontend that callbacks redirect to.
  pub frontend_base_url: String,
  /// Without a database URL the service runs on the in-memory store.
  pub database_url: Option<String>,
  pub seed_demo_catalog: bool,

  pub geo: GeoConfig,
  pub paypal: PayPalConfig,
  pub settlement: SettlementConfig,
  pub tariff: ShippingTariff,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let get_or = |var_name: &str, default: &str| get_env(var_name).unwrap_or_else(|_| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
    let frontend_base_url = get_or("FRONTEND_BASE_URL", "http://localhost:5173");
    let database_url = get_env("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
    let seed_demo_catalog = parse_var("SEED_DEMO_CATALOG", &get_or("SEED_DEMO_CATALOG", "false"))?;

    let timeout = Duration::from_secs(parse_var("PROVIDER_TIMEOUT_SECS", &get_or("PROVIDER_TIMEOUT_SECS", "15"))?);

    let geo = GeoConfig {
      api_key: get_env("GOONG_API_KEY")?,
      api_base: get_or("GOONG_API_BASE", "https://rsapi.goong.io"),
      origin_address: get_or("SHIPPING_ORIGIN_ADDRESS", DEFAULT_ORIGIN_ADDRESS),
      timeout,
    };

    let paypal = PayPalConfig {
      client_id: get_env("PAYPAL_CLIENT_ID")?,
      client_secret: get_env("PAYPAL_CLIENT_SECRET")?,
      api_base: get_or("PAYPAL_API_BASE", "https://api-m.sandbox.paypal.com"),
      brand_name: get_or("PAYPAL_BRAND_NAME", "Storefront"),
      timeout,
    };

    let exchange_rate: Decimal = parse_var("EXCHANGE_RATE", &get_or("EXCHANGE_RATE", "23000"))?;
    if exchange_rate <= Decimal::ZERO {
      return Err(AppError::Config("EXCHANGE_RATE must be positive".to_string()));
    }
    let settlement = SettlementConfig {
      currency: get_or("SETTLEMENT_CURRENCY", "USD"),
      exchange_rate,
    };

    let defaults = ShippingTariff::default();
    let tariff = ShippingTariff {
      first_tier_fee: parse_var(
        "SHIPPING_FIRST_TIER_FEE",
        &get_or("SHIPPING_FIRST_TIER_FEE", &defaults.first_tier_fee.to_string()),
      )?,
      per_km_rate: parse_var(
        "SHIPPING_PER_KM_RATE",
        &get_or("SHIPPING_PER_KM_RATE", &defaults.per_km_rate.to_string()),
      )?,
    };

    tracing::info!(
      server_host = %server_host,
      server_port,
      persistent_store = database_url.is_some(),
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      app_base_url,
      frontend_base_url,
      database_url,
      seed_demo_catalog,
      geo,
      paypal,
      settlement,
      tariff,
    })
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}
