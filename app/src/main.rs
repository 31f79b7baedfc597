// src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use storefront::config::AppConfig;
use storefront::services::{GoongClient, PayPalGateway};
use storefront::state::{AppState, Stores};
use storefront::store::{MemoryStore, PgStore};
use storefront::web::configure_app_routes;

fn init_tracing(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter) // RUST_LOG override
    .with_span_events(FmtSpan::CLOSE); // span durations
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  let json_logs = std::env::var("LOG_FORMAT")
    .map(|format| format.eq_ignore_ascii_case("json"))
    .unwrap_or(false);
  init_tracing(json_logs);

  tracing::info!("Starting storefront server...");

  let config = AppConfig::from_env().context("failed to load application configuration")?;

  let stores = match config.database_url.as_deref() {
    Some(database_url) => {
      let store = PgStore::connect(database_url)
        .await
        .context("failed to connect to the database")?;
      tracing::info!("Connected to the database.");
      if config.seed_demo_catalog {
        tracing::warn!("SEED_DEMO_CATALOG only applies to the in-memory store; ignoring.");
      }
      Stores::shared(Arc::new(store))
    }
    None => {
      tracing::warn!("DATABASE_URL not set; orders are kept in memory and lost on restart.");
      let store = MemoryStore::new();
      if config.seed_demo_catalog {
        store.seed_demo_catalog();
      }
      Stores::shared(Arc::new(store))
    }
  };

  let geo = Arc::new(GoongClient::new(config.geo.clone()).context("failed to build the map provider client")?);
  let gateway = Arc::new(PayPalGateway::new(config.paypal.clone()).context("failed to build the payment gateway client")?);

  let server_address = format!("{}:{}", config.server_host, config.server_port);
  let app_state = AppState::new(config, stores, geo, gateway);

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  Ok(())
}
