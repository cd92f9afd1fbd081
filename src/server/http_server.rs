//! HTTP(S) server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;

use crate::parser::{parse_request, HttpRequest, Method};
use crate::server::auth::{self, CredentialStore};
use crate::server::config::{Auth, ServerConfig, Transport};
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};
use crate::server::router::{Dispatch, HandlerFuture, Route, Router};
use crate::server::tls;

/// Grace period for in-flight connections after a shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Transport tuning keys recognized in [`ServerConfig::extra_params`].
const PARAM_MAX_CONNECTIONS: &str = "maxConnections";
const PARAM_READ_BUFFER_SIZE: &str = "readBufferSize";

/// An HTTP(S) server.
///
/// Routes are registered up front; [`HttpServer::start`] snapshots them
/// together with the configuration and returns a [`ServerHandle`] for the
/// running listener. The same instance can be started again after the
/// handle is stopped.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The registered routes.
    pub(crate) routes: RwLock<Vec<Route>>,
    running: Arc<AtomicBool>,
}

/// Everything a connection task needs, shared read-only across requests.
pub(crate) struct ConnContext {
    pub(crate) router: Router,
    pub(crate) auth: Option<CredentialStore>,
    pub(crate) read_buffer_size: usize,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: RwLock::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a route.
    ///
    /// Routes registered after `start()` only take effect on the next
    /// start; the running listener works from a snapshot.
    pub async fn add_route<F, Fut>(&self, method: Method, path: impl Into<String>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        let handler = Arc::new(move |req: HttpRequest| -> HandlerFuture { Box::pin(handler(req)) });

        let route = Route {
            method,
            path: path.into(),
            handler,
        };

        self.routes.write().await.push(route);
    }

    /// Start the server.
    ///
    /// Builds the TLS context (when configured), binds the listening
    /// socket and spawns the accept loop. Fails with
    /// [`Error::AlreadyStarted`] while a previous start is still running.
    pub async fn start(&self) -> Result<ServerHandle, Error> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        match self.try_start().await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn try_start(&self) -> Result<ServerHandle, Error> {
        // Key material problems must surface before any socket is opened.
        let tls_context = match &self.config.transport {
            Transport::Tls(tls_config) => Some(tls::build_tls_context(tls_config)?),
            Transport::Plain => None,
        };

        let auth = match &self.config.auth {
            Auth::Basic(store) => Some(store.clone()),
            Auth::None => None,
        };
        if auth.is_some() && tls_context.is_none() {
            warn!(
                "Security warning: BASIC authentication is used without TLS. \
                 Login and password are transmitted in plain text."
            );
        }

        let listener = TcpListener::bind(&self.config.addr).await.map_err(|source| Error::Bind {
            addr: self.config.addr,
            source,
        })?;
        let local_addr = listener.local_addr()?;
        let scheme = if tls_context.is_some() { "https" } else { "http" };
        info!("Server listening on {scheme}://{local_addr}");
        if let Transport::Tls(tls_config) = &self.config.transport {
            if let Some(hostname) = &tls_config.hostname {
                info!("TLS certificate is expected to match hostname {hostname}");
            }
        }

        let router = Router::new(self.routes.read().await.clone());
        Self::display_endpoints(&router);

        let (max_connections, read_buffer_size) = transport_tuning(&self.config);

        let context = Arc::new(ConnContext {
            router,
            auth,
            read_buffer_size,
        });
        let acceptor = tls_context.map(TlsAcceptor::from);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(Self::accept_loop(
            listener,
            acceptor,
            context,
            max_connections,
            shutdown_rx,
        ));

        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            task: Some(task),
            running: Arc::clone(&self.running),
        })
    }

    /// Display the registered endpoints.
    fn display_endpoints(router: &Router) {
        info!("Registered endpoints:");
        for route in router.routes() {
            info!("  {method} {path}", method = route.method, path = route.path);
        }
    }

    /// Accept connections until a shutdown is signalled.
    async fn accept_loop(
        listener: TcpListener,
        acceptor: Option<TlsAcceptor>,
        context: Arc<ConnContext>,
        max_connections: usize,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_connections));
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                // Check for shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                // Accept new connections
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            Self::handle_new_connection(
                                socket,
                                addr,
                                acceptor.clone(),
                                semaphore.clone(),
                                context.clone(),
                                &mut tasks,
                            ).await;
                        },
                        Err(e) => {
                            if Self::handle_accept_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        Self::perform_shutdown(&mut tasks).await;
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        acceptor: Option<TlsAcceptor>,
        semaphore: Arc<Semaphore>,
        context: Arc<ConnContext>,
        tasks: &mut JoinSet<()>,
    ) {
        // Try to acquire a permit from the semaphore
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                if acceptor.is_none() {
                    // Only a clear-text connection can carry the 503; a TLS
                    // client is cut off before the handshake.
                    let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                        .with_content_type("text/plain")
                        .with_body_string("Server is at capacity, please try again later");
                    let _ = socket.write_all(&response.to_bytes()).await;
                }
                return;
            }
        };

        // Spawn a task to handle the connection
        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the
            // semaphore slot
            let _permit = permit;

            let result = match acceptor {
                Some(acceptor) => match acceptor.accept(socket).await {
                    Ok(mut stream) => Self::handle_connection(&mut stream, &context).await,
                    Err(e) => {
                        debug!("TLS handshake failed for {addr}: {e}");
                        return;
                    }
                },
                None => Self::handle_connection(&mut socket, &context).await,
            };

            // Per-request failures are contained within the request cycle.
            if let Err(e) = result {
                debug!("Connection from {addr} ended with error: {e}");
            }
        });
    }

    /// Handle accept errors. Returns true when the loop must stop.
    async fn handle_accept_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        tokio::time::sleep(Duration::from_millis(100)).await;
        false
    }

    /// Drain in-flight connections, bounded by the grace period.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Grace period elapsed, aborting {len} connections", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Handle a single connection: read, parse, authenticate, dispatch,
    /// respond.
    pub(crate) async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        context: &ConnContext,
    ) -> Result<(), Error> {
        let mut buf = vec![0; context.read_buffer_size];

        // Read data from the socket
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(()); // Connection closed
        }

        // Parse the HTTP request
        let request = match parse_request(&buf[..n]) {
            Ok(request) => request,
            Err(e) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                Self::write_response(socket, &response).await?;
                return Err(Error::ParseError(e));
            }
        };

        // The challenge filter runs before any routing happens. Rejection
        // is a response, not an error.
        if let Some(store) = &context.auth {
            if let Some(challenge) = auth::screen(store, &request) {
                Self::write_response(socket, &challenge).await?;
                return Ok(());
            }
        }

        let method = request.method;
        let path = request.route_path().to_string();

        match context.router.dispatch(method, &path) {
            Dispatch::Matched(route) => {
                // Call the handler
                let response = match (route.handler)(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        let response = HttpResponse::new(StatusCode::InternalServerError)
                            .with_content_type("text/plain")
                            .with_body_string(format!("Internal server error: {e}"));
                        Self::write_response(socket, &response).await?;
                        return Err(e);
                    }
                };

                Self::write_response(socket, &response).await?;
            }
            Dispatch::MethodNotAllowed(allowed) => {
                let allow = allowed
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");

                let response = HttpResponse::new(StatusCode::MethodNotAllowed)
                    .with_header("Allow", allow.clone())
                    .with_content_type("text/plain")
                    .with_body_string(format!(
                        "Method {method} not allowed for path: {path}. Allowed methods: {allow}"
                    ));

                Self::write_response(socket, &response).await?;
                return Err(Error::MethodNotAllowed(method, path));
            }
            Dispatch::NotFound => {
                let response = HttpResponse::new(StatusCode::NotFound)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Not found: {path}"));
                Self::write_response(socket, &response).await?;
                return Err(Error::NotFound(path));
            }
        }

        Ok(())
    }

    /// Write a response and close the stream, so TLS connections send
    /// close_notify.
    async fn write_response(
        socket: &mut (impl AsyncWrite + Unpin),
        response: &HttpResponse,
    ) -> Result<(), Error> {
        socket.write_all(&response.to_bytes()).await?;
        socket.shutdown().await?;
        Ok(())
    }
}

/// A handle to a running server, returned by [`HttpServer::start`].
///
/// The listener keeps running until [`ServerHandle::stop`] is called or
/// the handle is dropped; dropping without stopping tears the listener
/// down immediately.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl ServerHandle {
    /// The address the listener is actually bound to. Useful when the
    /// configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the server.
    ///
    /// Unblocks the accept loop, waits out the connection grace period and
    /// releases the listening socket. Consuming the handle makes a second
    /// stop unrepresentable; the originating [`HttpServer`] can be started
    /// again afterwards.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Accept loop task failed: {e}");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.shutdown_tx.try_send(());
            task.abort();
            self.running.store(false, Ordering::SeqCst);
        }
    }
}

/// Resolve transport tuning from the configuration and its opaque extra
/// parameters.
///
/// Recognized keys override the configuration fields; everything else is
/// forwarded to the debug log, unvalidated.
pub(crate) fn transport_tuning(config: &ServerConfig) -> (usize, usize) {
    let mut max_connections = config.max_connections;
    let mut read_buffer_size = config.read_buffer_size;

    for (key, value) in &config.extra_params {
        match key.as_str() {
            PARAM_MAX_CONNECTIONS => {
                if let Ok(parsed) = value.parse() {
                    max_connections = parsed;
                }
            }
            PARAM_READ_BUFFER_SIZE => {
                if let Ok(parsed) = value.parse() {
                    read_buffer_size = parsed;
                }
            }
            _ => debug!("Passing over transport parameter {key}={value}"),
        }
    }

    (max_connections, read_buffer_size)
}
