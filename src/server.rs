// HTTP server for the character designer UI
//
// Routes:
// - GET  /            page (traits form or password form)
// - POST /generate    run a generation, re-render the page
// - POST /unlock      try the override password, re-render the page
// - GET  /api/status  quota snapshot as JSON
// - GET  /health      liveness
// - GET  /metrics     Prometheus text (when enabled)

use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::metrics;
use crate::orchestrator::{truncate_traits, RequestOrchestrator, UNLOCK_SUCCESS_MESSAGE};
use crate::page::{self, PageView};
use crate::quota::ResetOutcome;

/// Shown when the override password does not match
pub const UNLOCK_REJECTED_MESSAGE: &str = "Password not accepted.";

#[derive(Debug, Deserialize)]
struct GenerateForm {
    #[serde(default)]
    traits: String,
}

#[derive(Debug, Deserialize)]
struct UnlockForm {
    #[serde(default)]
    password: String,
}

/// Build the application router
pub fn router(orchestrator: Arc<RequestOrchestrator>, metrics_enabled: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(index_handler))
        .route("/generate", post(generate_handler))
        .route("/unlock", post(unlock_handler))
        .route("/api/status", get(status_handler))
        .route("/health", get(health_handler));

    if metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.with_state(orchestrator).layer(TraceLayer::new_for_http())
}

/// Serve the UI until the process is stopped
pub async fn serve(
    orchestrator: Arc<RequestOrchestrator>,
    addr: SocketAddr,
    metrics_enabled: bool,
) -> Result<()> {
    if metrics_enabled {
        metrics::init().context("Failed to initialize metrics")?;
    }

    let app = router(orchestrator, metrics_enabled);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Character designer listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn index_handler(State(orchestrator): State<Arc<RequestOrchestrator>>) -> Html<String> {
    let view = PageView {
        open: orchestrator.is_open().await,
        ..Default::default()
    };
    Html(page::render(&view))
}

async fn generate_handler(
    State(orchestrator): State<Arc<RequestOrchestrator>>,
    Form(form): Form<GenerateForm>,
) -> Html<String> {
    let traits = truncate_traits(&form.traits).to_string();
    let generation = orchestrator.generate(&traits).await;

    let view = PageView {
        open: orchestrator.is_open().await,
        result: Some(generation.message().to_string()),
        traits,
        ..Default::default()
    };
    Html(page::render(&view))
}

async fn unlock_handler(
    State(orchestrator): State<Arc<RequestOrchestrator>>,
    Form(form): Form<UnlockForm>,
) -> Html<String> {
    let mut view = PageView::default();
    match orchestrator.unlock(&form.password).await {
        ResetOutcome::Success => view.notice = Some(UNLOCK_SUCCESS_MESSAGE.to_string()),
        ResetOutcome::Rejected => view.rejection = Some(UNLOCK_REJECTED_MESSAGE.to_string()),
    }
    view.open = orchestrator.is_open().await;
    Html(page::render(&view))
}

async fn status_handler(State(orchestrator): State<Arc<RequestOrchestrator>>) -> Response {
    Json(orchestrator.status().await).into_response()
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Metrics endpoint handler
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error gathering metrics".to_string(),
            )
                .into_response()
        }
    }
}
