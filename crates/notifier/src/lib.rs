//! Outbound delivery to the notification gateway.

pub mod client;

pub use client::{DeliveryClient, GatewayClient};
