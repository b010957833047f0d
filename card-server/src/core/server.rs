//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::core::{Config, ServerState};
use crate::utils::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn new(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let app = crate::api::router()
            // CORS - Handle cross-origin requests
            .layer(CorsLayer::permissive())
            // Trace - Request tracing (logs at INFO level)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Card server starting on {}", addr);
        tracing::info!("  Environment : {}", self.config.environment);
        tracing::info!("  Database    : {}", self.config.database_path);
        tracing::info!("  App URL     : {}", self.config.app_url);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
            })
            .await
            .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

        Ok(())
    }
}
