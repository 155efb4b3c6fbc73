//! Shopify adapter implementing the store-credit gateway port.

mod client;

pub use client::{ShopifyConfig, ShopifyStoreCreditClient};
