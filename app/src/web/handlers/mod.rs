// src/web/handlers/mod.rs

pub mod checkout_handlers;
pub mod gateway_handlers;
pub mod order_handlers;
pub mod shipping_handlers;
