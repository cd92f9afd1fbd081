//! HTTP(S) server implementation for portcullis.
//!
//! This module provides the listener and its collaborators: configuration,
//! TLS context construction, the Basic-Auth challenge filter, the route
//! table, and the request/response types.

mod auth;
mod config;
mod error;
mod http_server;
mod response;
mod router;
mod tls;

// Re-export public items
pub use auth::CredentialStore;
pub use config::{Auth, ServerConfig, TlsConfig, Transport, TrustStore};
pub use error::Error;
pub use http_server::{HttpServer, ServerHandle};
pub use response::{HttpResponse, StatusCode};
pub use router::Route;
