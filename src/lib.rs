//! An embeddable HTTP/HTTPS server with pluggable routing and HTTP Basic
//! Authentication.
//!
//! portcullis is the listener for services that need a small, guarded HTTP
//! surface without a full web framework: register handlers for exact
//! (method, path) pairs, optionally put them behind a Basic-Auth challenge,
//! optionally terminate TLS with your own key material and a cipher
//! blacklist, then `start()`.
//!
//! # Features
//!
//! - HTTP/1.x request parsing and plain-bytes responses
//! - Exact-match routing with async handlers
//! - HTTP Basic Authentication with a per-realm credential store
//! - TLS via rustls: PEM key store, optional trust store, disabled cipher
//!   suites
//! - Lifecycle handle with prompt, graceful `stop()`
//!
//! # Examples
//!
//! ## A plain server
//!
//! ```no_run
//! use portcullis::{HttpResponse, HttpServer, Method, ServerConfig, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portcullis::ServerError> {
//!     let server = HttpServer::new(ServerConfig::default());
//!
//!     server.add_route(Method::GET, "/", |_req| async {
//!         Ok(HttpResponse::new(StatusCode::Ok)
//!             .with_content_type("text/plain")
//!             .with_body_string("This is an easy resource (as plain text)"))
//!     }).await;
//!
//!     let handle = server.start().await?;
//!     // ... serve until it is time to go
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## TLS with Basic Authentication
//!
//! ```no_run
//! use portcullis::{
//!     Auth, CredentialStore, HttpServer, ServerConfig, TlsConfig, Transport,
//! };
//!
//! # async fn run() -> Result<(), portcullis::ServerError> {
//! let mut users = CredentialStore::new("My WebService");
//! users.add_user("login", "password")?;
//!
//! let config = ServerConfig {
//!     addr: "0.0.0.0:8443".parse().unwrap(),
//!     transport: Transport::Tls(
//!         TlsConfig::new("/etc/portcullis/server.pem")?
//!             .with_hostname("localhost")
//!             .with_disabled_ciphers(["TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA"]),
//!     ),
//!     auth: Auth::Basic(users),
//!     ..ServerConfig::default()
//! };
//!
//! let server = HttpServer::new(config);
//! let handle = server.start().await?;
//! # handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! See the `demos` directory for complete runnable examples.

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{parse_request, Error as ParserError, HttpRequest, HttpVersion, Method};
pub use server::{
    Auth, CredentialStore, Error as ServerError, HttpResponse, HttpServer, Route, ServerConfig,
    ServerHandle, StatusCode, TlsConfig, Transport, TrustStore,
};
