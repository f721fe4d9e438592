//! Router assembly for the Pillgraph REST API.
//!
//! Shared between `main.rs` and the integration tests so both drive the
//! exact same middleware and route table.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::handlers;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full application router for the given state.
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let cors = match state.config.server.cors_allow_origin.as_str() {
        "*" => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        origin => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{}'", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/api/v1/health", get(handlers::health_handler))
        .route("/api/v1/metrics", get(handlers::metrics_handler))
        .route(
            "/api/v1/medications/{name}",
            get(handlers::get_medication_handler),
        )
        .route(
            "/api/v1/ingredients/{name}",
            get(handlers::get_ingredient_handler),
        )
        .route("/api/v1/effects/{name}", get(handlers::get_effect_handler))
        .route("/api/v1/search", get(handlers::search_handler))
        .route("/api/v1/graph", get(handlers::graph_handler))
        .route("/api/v1/data", post(handlers::merge_handler))
        .route("/api/v1/scan", post(handlers::scan_handler))
        .route(
            "/api/v1/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Middleware (order matters: first added = outermost)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_counter_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

/// Middleware that increments the global request counter.
async fn request_counter_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.total_requests.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}
