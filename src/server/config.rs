//! Server configuration.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::server::auth::CredentialStore;
use crate::server::error::Error;

/// HTTP(S) server configuration.
///
/// `start()` takes a snapshot of this value; mutating the configuration
/// afterwards has no effect on a running listener.
#[derive(Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// Clear-text TCP or TLS.
    pub transport: Transport,
    /// Per-request authentication policy.
    pub auth: Auth,
    /// Opaque parameters forwarded to the transport layer, unvalidated.
    pub extra_params: HashMap<String, String>,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".parse().unwrap(),
            transport: Transport::Plain,
            auth: Auth::None,
            extra_params: HashMap::new(),
            max_connections: 1024,
            read_buffer_size: 8192,
        }
    }
}

/// Transport selection for the listener.
#[derive(Clone)]
pub enum Transport {
    /// Clear-text HTTP.
    Plain,
    /// HTTP over TLS.
    Tls(TlsConfig),
}

/// Per-request authentication policy.
#[derive(Clone, Debug)]
pub enum Auth {
    /// Every request is forwarded to the router.
    None,
    /// HTTP Basic Authentication against a credential store.
    Basic(CredentialStore),
}

/// TLS material and policy for an HTTPS listener.
///
/// The key store is a PEM bundle holding the server certificate chain and
/// the matching private key.
#[derive(Clone)]
pub struct TlsConfig {
    /// Hostname this server is reachable under. A mismatch with the
    /// certificate is reported by clients, not enforced here.
    pub hostname: Option<String>,
    key_store_path: PathBuf,
    key_store_password: Option<String>,
    key_password: Option<String>,
    trust_store: Option<TrustStore>,
    disabled_ciphers: Vec<String>,
}

impl TlsConfig {
    /// Create a TLS configuration from a key store path.
    ///
    /// The path is checked for existence here, before any socket is opened.
    pub fn new(key_store_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let key_store_path = key_store_path.into();
        if !key_store_path.exists() {
            return Err(Error::KeyMaterialNotFound(key_store_path));
        }
        Ok(Self {
            hostname: None,
            key_store_path,
            key_store_password: None,
            key_password: None,
            trust_store: None,
            disabled_ciphers: Vec::new(),
        })
    }

    /// Set the hostname clients are expected to connect with.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Password of the key store itself.
    ///
    /// PEM bundles must be unencrypted; the password only sharpens the
    /// error message when no key can be read.
    pub fn with_key_store_password(mut self, password: impl Into<String>) -> Self {
        self.key_store_password = Some(password.into());
        self
    }

    /// Password of the private key inside the store.
    pub fn with_key_password(mut self, password: impl Into<String>) -> Self {
        self.key_password = Some(password.into());
        self
    }

    /// Install a trust store for validating peer certificates.
    pub fn with_trust_store(mut self, trust_store: TrustStore) -> Self {
        self.trust_store = Some(trust_store);
        self
    }

    /// Cipher suites the listener must refuse, by canonical name
    /// (e.g. `TLS13_AES_256_GCM_SHA384`).
    ///
    /// Names that match no supported suite are forwarded silently; there is
    /// no typo detection.
    pub fn with_disabled_ciphers<I, S>(mut self, ciphers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_ciphers = ciphers.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the key store PEM bundle.
    pub fn key_store_path(&self) -> &Path {
        &self.key_store_path
    }

    pub(crate) fn key_store_password(&self) -> Option<&str> {
        self.key_store_password.as_deref()
    }

    pub(crate) fn key_password(&self) -> Option<&str> {
        self.key_password.as_deref()
    }

    pub(crate) fn trust_store(&self) -> Option<&TrustStore> {
        self.trust_store.as_ref()
    }

    pub(crate) fn disabled_ciphers(&self) -> &[String] {
        &self.disabled_ciphers
    }
}

/// Trusted root certificates for validating peer certificates, as a PEM
/// file of certificates.
#[derive(Clone)]
pub struct TrustStore {
    path: PathBuf,
    password: Option<String>,
    kind: Option<String>,
}

impl TrustStore {
    /// Create a trust store from a path, checked for existence eagerly.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        if !path.exists() {
            return Err(Error::TrustMaterialNotFound(path));
        }
        Ok(Self {
            path,
            password: None,
            kind: None,
        })
    }

    /// Password of the trust store. Unused for PEM stores, kept for
    /// surface parity.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Informational store type label, passed through unvalidated.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Path of the trust store PEM file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub(crate) fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}
