//! Client for the hosted checkout payment gateway.
//!
//! The gateway exposes a small REST API. This crate only covers what the payment engine needs: creating hosted orders
//! for the checkout widget, and reading them back.
mod api;
mod config;
mod error;

pub mod data_objects;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{GatewayOrder, NewGatewayOrder};
pub use error::GatewayApiError;
