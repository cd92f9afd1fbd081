//! HTTP request parsing.
//!
//! A small HTTP/1.x request parser: enough to feed the server's router and
//! authentication filter without pulling in a full framework.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
