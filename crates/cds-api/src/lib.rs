//! CDS API Client
//!
//! Typed access to the CDS REST API used by the console stores.
//!
//! # Core Concepts
//!
//! - [`Transport`]: one request in, one raw response out; mocked in tests
//! - [`HttpTransport`]: `reqwest` implementation configured by [`ApiConfig`]
//! - [`CdsClient`]: one async method per endpoint, decoding JSON bodies
//! - [`ApiError`]: transport, status and decode failures; never retried
//!
//! # Example
//!
//! ```rust,ignore
//! use cds_api::{ApiConfig, CdsClient};
//!
//! let config = ApiConfig::new().with_env_overrides();
//! let client = CdsClient::from_config(&config)?;
//! let project = client.get_project(&key, &[LoadOpt::WorkflowNames]).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod client;
mod config;
mod endpoints;
mod error;
mod request;
mod transport;

pub use client::CdsClient;
pub use config::{ApiConfig, ENV_API_URL, ENV_SESSION_TOKEN};
pub use endpoints::Favorite;
pub use error::{ApiError, ApiResult};
pub use request::{ApiRequest, ApiResponse, Body, Method};
pub use transport::{HttpTransport, Transport, SESSION_TOKEN_HEADER};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
