//! # shopsync-api
//!
//! Resilient access to the storefront admin API.
//!
//! [`Client::request`] is the single choke point: it attaches credentials,
//! serves short-lived cached reads, retries rate-limited and failing requests,
//! follows host redirects and decodes bodies. The typed accessors in
//! [`resources`] page through each collection on top of it.

pub mod cache;
pub mod client;
pub mod error;
pub mod resources;
pub mod retry;

pub use client::{Body, Client, DEFAULT_GET_TTL};
pub use error::ApiError;
pub use resources::{AssetPayload, PAGE_SIZE};
pub use retry::RetryPolicy;
