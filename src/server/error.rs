//! Error types for the HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::{Error as ParserError, Method};

/// Errors that can occur during server configuration and operation.
///
/// Configuration and bind errors are fatal to `start()` and propagate to
/// the caller; per-request failures are contained within the request cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The key store file does not exist.
    #[error("Key store {} does not exist", .0.display())]
    KeyMaterialNotFound(PathBuf),

    /// The trust store file does not exist.
    #[error("Trust store {} does not exist", .0.display())]
    TrustMaterialNotFound(PathBuf),

    /// The key store exists but no usable certificate or key was read.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The trust store exists but no usable certificate was read.
    #[error("Invalid trust material: {0}")]
    InvalidTrustMaterial(String),

    /// TLS configuration was rejected by rustls.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// `start()` was called while the server is already running.
    #[error("Server already started")]
    AlreadyStarted,

    /// The listening socket could not be bound; the OS error is the source.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The same login was registered twice.
    #[error("User {0} is already registered")]
    DuplicateUser(String),

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Method not allowed for the requested resource.
    #[error("Method {0} not allowed for path: {1}")]
    MethodNotAllowed(Method, String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),
}
