use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

use super::recommend::recommend;
use super::state::ServerState;
use super::{cors_layer, log_requests, ServerConfig};
use crate::pipeline::MoodPipeline;

pub const HEALTH_MESSAGE: &str = "MoodMate API is running";

#[derive(Serialize)]
struct HomeResponse {
    message: &'static str,
}

async fn home() -> impl IntoResponse {
    Json(HomeResponse {
        message: HEALTH_MESSAGE,
    })
}

pub fn make_app(config: ServerConfig, pipeline: Arc<MoodPipeline>) -> Result<Router> {
    let state = ServerState::new(config.clone(), pipeline);

    let api_routes: Router = Router::new()
        .route("/", get(home))
        .route("/recommend", post(recommend))
        .layer(DefaultBodyLimit::max(config.max_request_body_bytes))
        .with_state(state.clone());

    let mut app: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            api_routes.fallback_service(static_files_service)
        }
        None => api_routes,
    };

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));
    app = app.layer(cors_layer(&config.cors_origins)?);

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    bind_address: &str,
    pipeline: Arc<MoodPipeline>,
) -> Result<()> {
    let address = format!("{}:{}", bind_address, config.port);
    let app = make_app(config, pipeline)?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await?;
    Ok(())
}
