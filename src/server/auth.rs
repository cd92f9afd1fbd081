//! HTTP Basic Authentication: credential storage and the challenge filter.

use std::collections::HashMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::parser::HttpRequest;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

/// A named realm and its registered (login, password) pairs.
///
/// Passwords are held as raw bytes and never logged; the `Debug`
/// representation redacts them.
#[derive(Clone)]
pub struct CredentialStore {
    realm: String,
    users: HashMap<String, Vec<u8>>,
}

impl CredentialStore {
    /// Create an empty store for the given realm.
    ///
    /// The realm is the label a client displays when prompting for
    /// credentials.
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            users: HashMap::new(),
        }
    }

    /// The realm this store challenges for.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Register a user.
    ///
    /// Re-registering an existing login is refused rather than silently
    /// overwriting the stored password.
    pub fn add_user(&mut self, login: impl Into<String>, password: impl AsRef<[u8]>) -> Result<(), Error> {
        let login = login.into();
        if self.users.contains_key(&login) {
            return Err(Error::DuplicateUser(login));
        }
        self.users.insert(login, password.as_ref().to_vec());
        Ok(())
    }

    /// Check a (login, password) pair against the registered users.
    pub fn verify(&self, login: &str, password: &[u8]) -> bool {
        self.users.get(login).is_some_and(|stored| stored == password)
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no users are registered.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("realm", &self.realm)
            .field("users", &format_args!("<{} redacted>", self.users.len()))
            .finish()
    }
}

/// Screen a request against the credential store.
///
/// Returns the challenge response to send when the request must be
/// rejected. A missing header, a malformed header and wrong credentials
/// all produce the same bytes so a client cannot probe for registered
/// logins.
pub(crate) fn screen(store: &CredentialStore, request: &HttpRequest) -> Option<HttpResponse> {
    let authorized = request
        .get_header("Authorization")
        .and_then(|value| decode_basic(value))
        .map(|(login, password)| store.verify(&login, password.as_bytes()))
        .unwrap_or(false);

    if authorized {
        None
    } else {
        Some(challenge(store.realm()))
    }
}

/// The 401 challenge for a realm.
pub(crate) fn challenge(realm: &str) -> HttpResponse {
    HttpResponse::new(StatusCode::Unauthorized)
        .with_header("WWW-Authenticate", format!("Basic realm=\"{realm}\""))
        .with_content_type("text/plain")
        .with_body_string("Unauthorized")
}

/// Decode an `Authorization: Basic <base64(login:password)>` header value.
fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, payload) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }
    let decoded = BASE64.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;
    Some((login.to_string(), password.to_string()))
}
