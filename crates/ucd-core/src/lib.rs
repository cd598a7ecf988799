//! # ucd-core
//!
//! Shared REST invocation layer for UrbanCode Deploy clients.
//!
//! This crate sends authenticated requests to the server and classifies the
//! outcome. It also retries optimistic-concurrency conflicts and polls for
//! work the server finishes asynchronously. Resource-specific clients build
//! [`EndpointRequest`]s and hand them to a [`RestClient`].
//!
//! ## Modules
//!
//! - [`encode`] - Percent-encoding for caller-supplied URL segments
//! - [`request`] - Endpoint descriptions (verb, URL, body)
//! - [`response`] - Draining and reading completed exchanges
//! - [`client`] - HTTP client construction and the request executor
//! - [`retry`] - `409 Conflict` retry with jittered backoff
//! - [`poll`] - Bounded polling for existence and completion
//! - [`config`] - Server, proxy and TLS settings
//! - [`query`] - Query string builder
//! - [`id`] - Strongly-typed object identifiers
//! - [`error`] - Error type and conversions

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod id;
pub mod poll;
pub mod query;
pub mod request;
pub mod response;
pub mod retry;

// Re-export commonly used types
pub use client::{ClientConfig, RestClient, RestClientBuilder, Transport};
pub use config::{ProxyConfig, ServerConfig};
pub use encode::encode_path;
pub use error::{Error, Result};
pub use poll::{PollConfig, PollStatus};
pub use query::QueryParams;
pub use request::EndpointRequest;
pub use response::Exchange;
pub use retry::ConflictRetry;
