//! An HTTPS server guarded by Basic Authentication.
//!
//! Expects a PEM bundle holding the certificate chain and the private key:
//!
//! ```text
//! openssl req -x509 -newkey ec -pkeyopt ec_paramgen_curve:P-256 \
//!     -keyout key.pem -out cert.pem -days 365 -nodes -subj /CN=localhost
//! cat cert.pem key.pem > server.pem
//! PORTCULLIS_KEY_STORE=server.pem cargo run --example secure_server
//! ```

use log::info;
use portcullis::{
    Auth, CredentialStore, HttpResponse, HttpServer, Method, ServerConfig, StatusCode, TlsConfig,
    Transport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let key_store = std::env::var("PORTCULLIS_KEY_STORE")?;

    let mut users = CredentialStore::new("My WebService");
    users.add_user("login", "password")?;

    let config = ServerConfig {
        addr: "127.0.0.1:8443".parse()?,
        transport: Transport::Tls(
            TlsConfig::new(key_store)?
                .with_hostname("localhost")
                .with_disabled_ciphers(["TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA"]),
        ),
        auth: Auth::Basic(users),
        ..ServerConfig::default()
    };

    let server = HttpServer::new(config);
    server
        .add_route(Method::GET, "/", |_req| async move {
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string("This is an easy resource (as plain text)"))
        })
        .await;

    let handle = server.start().await?;
    info!("Serving on https://{}", handle.local_addr());

    tokio::signal::ctrl_c().await?;
    handle.stop().await;

    Ok(())
}
