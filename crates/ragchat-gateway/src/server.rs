use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::{mpsc, watch};

use crate::error::GatewayError;
use crate::handlers::ChatJob;
use crate::router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub chat_tx: mpsc::Sender<ChatJob>,
    pub include_sources: bool,
    pub started_at: Instant,
}

pub struct GatewayServer {
    addr: SocketAddr,
    cors_origins: Vec<String>,
    max_body_size: usize,
    include_sources: bool,
    chat_tx: mpsc::Sender<ChatJob>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        chat_tx: mpsc::Sender<ChatJob>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        if bind == "0.0.0.0" {
            tracing::warn!("gateway binding to 0.0.0.0, the chat endpoint has no authentication");
        }

        Self {
            addr,
            cors_origins: Vec::new(),
            max_body_size: 1_048_576,
            include_sources: false,
            chat_tx,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    #[must_use]
    pub fn with_include_sources(mut self, include: bool) -> Self {
        self.include_sources = include;
        self
    }

    /// Routes and middleware the server mounts, without binding a listener.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        let state = AppState {
            chat_tx: self.chat_tx.clone(),
            include_sources: self.include_sources,
            started_at: Instant::now(),
        };
        build_router(state, &self.cors_origins, self.max_body_size)
    }

    /// Start the HTTP gateway server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        tracing::info!("gateway listening on {}", self.addr);

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow_and_update() {
                    if shutdown_rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                tracing::info!("gateway shutting down");
            })
            .await
            .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}
