//! TLS context construction with rustls.
//!
//! Key and trust material are PEM files read with rustls-pemfile; the
//! cipher blacklist is applied by filtering the ring provider's suite list
//! before the server context is built.

use std::io::BufReader;
use std::sync::Arc;

use log::debug;
use rustls::crypto::CryptoProvider;
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;

use crate::server::config::{TlsConfig, TrustStore};
use crate::server::error::Error;

/// Build a [`rustls::ServerConfig`] from the TLS configuration.
///
/// The key store bundle must contain the certificate chain and an
/// unencrypted private key. When a trust store is configured its roots are
/// installed as an optional client-certificate verifier.
pub(crate) fn build_tls_context(config: &TlsConfig) -> Result<Arc<rustls::ServerConfig>, Error> {
    let pem = std::fs::read(config.key_store_path()).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::KeyMaterialNotFound(config.key_store_path().to_path_buf())
        }
        _ => Error::IoError(e),
    })?;

    let certs = rustls_pemfile::certs(&mut BufReader::new(&pem[..]))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            Error::InvalidKeyMaterial(format!(
                "unreadable certificate in {}: {e}",
                config.key_store_path().display()
            ))
        })?;
    if certs.is_empty() {
        return Err(Error::InvalidKeyMaterial(format!(
            "no certificate found in {}",
            config.key_store_path().display()
        )));
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(&pem[..]))
        .map_err(|e| {
            Error::InvalidKeyMaterial(format!(
                "unreadable private key in {}: {e}",
                config.key_store_path().display()
            ))
        })?
        .ok_or_else(|| {
            if config.key_store_password().is_some() || config.key_password().is_some() {
                Error::InvalidKeyMaterial(
                    "password-protected key material is not supported; provide an unencrypted PEM key".to_string(),
                )
            } else {
                Error::InvalidKeyMaterial(format!(
                    "no private key found in {}",
                    config.key_store_path().display()
                ))
            }
        })?;

    let provider = Arc::new(filtered_provider(config.disabled_ciphers()));

    let builder = rustls::ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let server_config = match config.trust_store() {
        Some(trust) => {
            let roots = load_trust_roots(trust)?;
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .allow_unauthenticated()
                .build()
                .map_err(|e| Error::InvalidTrustMaterial(e.to_string()))?;
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(certs, key)?
        }
        None => builder.with_no_client_auth().with_single_cert(certs, key)?,
    };

    Ok(Arc::new(server_config))
}

/// The ring provider with blacklisted suites removed.
///
/// Suites are matched by canonical name; a name that matches no supported
/// suite disables nothing.
pub(crate) fn filtered_provider(disabled: &[String]) -> CryptoProvider {
    let mut provider = rustls::crypto::ring::default_provider();
    if !disabled.is_empty() {
        provider.cipher_suites.retain(|suite| {
            let name = format!("{:?}", suite.suite());
            let blacklisted = disabled.iter().any(|d| *d == name);
            if blacklisted {
                debug!("Disabling cipher suite {name}");
            }
            !blacklisted
        });
    }
    provider
}

fn load_trust_roots(trust: &TrustStore) -> Result<RootCertStore, Error> {
    if let Some(kind) = trust.kind() {
        debug!("Trust store type {kind} is read as PEM");
    }
    if trust.password().is_some() {
        debug!("Trust store passwords are not used for PEM stores");
    }

    let pem = std::fs::read(trust.path()).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::TrustMaterialNotFound(trust.path().to_path_buf()),
        _ => Error::IoError(e),
    })?;

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut BufReader::new(&pem[..])) {
        let cert = cert.map_err(|e| {
            Error::InvalidTrustMaterial(format!(
                "unreadable certificate in {}: {e}",
                trust.path().display()
            ))
        })?;
        roots
            .add(cert)
            .map_err(|e| Error::InvalidTrustMaterial(e.to_string()))?;
    }
    if roots.is_empty() {
        return Err(Error::InvalidTrustMaterial(format!(
            "no certificate found in {}",
            trust.path().display()
        )));
    }
    Ok(roots)
}
