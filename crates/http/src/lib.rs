//! Admin dashboard HTTP client
//!
//! Wire types for the admin API plus, behind the `client` feature, an
//! [`ApiClient`](client::ApiClient) that attaches bearer tokens and renews an
//! expired access token once on behalf of every request that hit the 401.

pub mod types;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "client")]
pub use client::{ApiClient, ApiRequest, error::ClientError};
