use std::net::SocketAddr;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::http::handlers::admin_handler::{
    grant_license, list_all_devices, list_all_licenses, rotate_device_credentials,
};
use crate::http::handlers::device_handler::{
    get_device, list_devices, list_remote_devices, provision_device,
};
use crate::http::handlers::license_handler::{activate_license, list_licenses, purchase_license};
use crate::http::state::AppState;

/// HTTP server configuration
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Assemble the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/devices", post(provision_device).get(list_devices))
        .route("/api/devices/remote", get(list_remote_devices))
        .route("/api/devices/:device_id", get(get_device))
        .route("/api/licenses", post(purchase_license).get(list_licenses))
        .route("/api/licenses/:batch_id/activate", put(activate_license))
        .route(
            "/api/admin/licenses",
            post(grant_license).get(list_all_licenses),
        )
        .route("/api/admin/devices", get(list_all_devices))
        .route(
            "/api/admin/devices/:remote_device_id/credentials",
            put(rotate_device_credentials),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server with graceful shutdown
pub async fn run_http_server(
    config: HttpServerConfig,
    state: AppState,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            info!("HTTP server shutdown signal received");
        })
        .await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}
