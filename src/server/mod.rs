pub mod chat;
pub mod upload;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::config::Config;
pub use upload::{DiskBackend, ProxyBackend, UploadBackend};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub uploads: Arc<dyn UploadBackend>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/upload", post(upload::upload_handler))
        .route("/api/uploads/:name", get(upload::stored_file_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub fn backend_from_config(config: &Config) -> Arc<dyn UploadBackend> {
    match &config.upload_proxy {
        Some(upstream) => Arc::new(ProxyBackend::new(upstream.as_str())),
        None => Arc::new(DiskBackend::new(config.upload_dir.clone())),
    }
}

pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState {
        uploads: backend_from_config(config),
    };
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
