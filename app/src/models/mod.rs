// src/models/mod.rs

//! Domain entities shared by the store, the services and the pipelines.

pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod product;

pub use cart_item::{CartItem, CartLineKey};
pub use order::{
  Order, OrderStatus, OrderTransition, PaymentInfo, PaymentMethod, PaymentStatus, ShippingAddress,
};
pub use order_item::OrderItem;
pub use product::{Product, ProductImage, Variation};
