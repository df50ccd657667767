use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use ian_core::{Error, Result};

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/articles/generate", post(handlers::generate_article))
        .route("/api/ollama/status", get(handlers::backend_status))
        .route("/api/ollama/info", get(handlers::backend_info))
        .route("/api/ollama/test", post(handlers::test_prompt))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("cannot listen on {}: {}", addr, e)))?;
    tracing::info!("🌐 Listening on http://{}", addr);
    axum::serve(listener, create_app(state))
        .await
        .map_err(|e| Error::External(e.into()))
}

pub mod prelude {
    pub use ian_core::{Article, Result, Error};
    pub use crate::AppState;
}
