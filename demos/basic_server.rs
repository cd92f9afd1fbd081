//! A basic HTTP server example demonstrating routing and lifecycle.

use log::info;
use portcullis::{HttpResponse, HttpServer, Method, ServerConfig, StatusCode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    let config = ServerConfig {
        addr: "127.0.0.1:8081".parse()?,
        max_connections: 100,
        read_buffer_size: 4096,
        ..ServerConfig::default()
    };

    let server = HttpServer::new(config);

    // A plain-text resource on the root path
    server
        .add_route(Method::GET, "/", |_req| async move {
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string("This is an easy resource (as plain text)"))
        })
        .await;

    // A route that reads a query parameter
    server
        .add_route(Method::GET, "/hello", |req| async move {
            let name = req.get_query_param("name").map_or("World", |s| s.as_str());
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string(format!("Hello, {name}!")))
        })
        .await;

    let handle = server.start().await?;
    info!("Serving on http://{}", handle.local_addr());

    tokio::signal::ctrl_c().await?;
    handle.stop().await;

    Ok(())
}
