// src/lib.rs

//! Storefront checkout backend: order creation, shipping quotes, gateway
//! callbacks and order queries, built on `stepline` pipelines.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
