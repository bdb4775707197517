//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::crypto::{EncryptionService, Pbkdf2Sha256};
use crate::secrets::store::{create_secret_store, SecretStoreType};
use crate::secrets::SecretService;

use super::secrets as secrets_api;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub secrets: Arc<SecretService>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store_type = SecretStoreType::from_str(&config.store_backend);
    let store = create_secret_store(store_type, config.data_dir.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize secret store: {}", e))?;
    tracing::info!(
        "Secret store initialized (backend: {:?}, persistent: {})",
        store_type,
        store.is_persistent()
    );

    let crypto = Arc::new(EncryptionService::new(Arc::new(Pbkdf2Sha256)));
    let secrets = Arc::new(SecretService::new(Arc::from(store), crypto));

    // Relay access events to external collaborators (notification, geo-IP).
    // The service emits them; it never performs lookups itself.
    let mut access_events = secrets.subscribe_access_events();
    tokio::spawn(async move {
        loop {
            match access_events.recv().await {
                Ok(event) => {
                    tracing::info!(
                        secret_id = %event.secret_id,
                        occurred_at = %event.occurred_at,
                        "secret accessed"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("access event relay lagged, skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let state = Arc::new(AppState {
        config: config.clone(),
        secrets,
    });

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/secrets", secrets_api::routes())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// GET /
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Secret Manager API" }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
