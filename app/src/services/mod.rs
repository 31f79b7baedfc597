// src/services/mod.rs

//! Leaf components of the checkout workflow and their concrete providers.

pub mod catalog;
pub mod goong;
pub mod inventory;
pub mod payment_gateway;
pub mod paypal;
pub mod shipping;

pub use catalog::{CatalogLookup, LineItemError, LineRequest, LookupError, ResolvedLine};
pub use goong::GoongClient;
pub use inventory::{AppliedDecrements, InventoryUpdater, StockLine};
pub use payment_gateway::{CaptureOutcome, CaptureStatus, GatewayError, IntentRequest, OpenedIntent, PaymentGateway};
pub use paypal::PayPalGateway;
pub use shipping::{Coordinates, GeoProvider, ShippingError, ShippingEstimator, ShippingQuote};
