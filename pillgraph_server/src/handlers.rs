//! Axum route handlers for the Pillgraph REST API.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::{info, warn};

use pillgraph_core::{get_effect, get_ingredient, get_medication, search_effects, EntityKind};

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use crate::types::*;
use crate::vision::{parse_data_url, parse_scan_output, ScanAnalysis};

// ---------------------------------------------------------------------------
// Health & Metrics
// ---------------------------------------------------------------------------

/// Health check endpoint returning server status and provider availability.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        vision_provider: state.config.vision.provider.clone(),
        vision_ready: state.vision.is_some(),
        snapshot_path: state.config.storage.snapshot_path.clone(),
    })
}

/// Server metrics including request counts, entity counts, and uptime.
#[utoipa::path(
    get,
    path = "/api/v1/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Server metrics", body = MetricsResponse)
    )
)]
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let graph = state.store.snapshot();
    Json(MetricsResponse {
        total_requests: state.total_requests.load(Ordering::Relaxed),
        total_scans: state.total_scans.load(Ordering::Relaxed),
        total_merges: state.total_merges.load(Ordering::Relaxed),
        total_searches: state.total_searches.load(Ordering::Relaxed),
        uptime_secs: state.start_time.elapsed().as_secs(),
        medication_count: graph.medications.len(),
        ingredient_count: graph.ingredients.len(),
        effect_count: graph.effects.len(),
    })
}

// ---------------------------------------------------------------------------
// Entity lookups
// ---------------------------------------------------------------------------

/// Look up a medication by name (case-insensitive).
#[utoipa::path(
    get,
    path = "/api/v1/medications/{name}",
    tag = "Entities",
    params(("name" = String, Path, description = "Medication name")),
    responses(
        (status = 200, description = "The medication", body = MedicationResponse),
        (status = 404, description = "No such medication", body = ApiError)
    )
)]
pub async fn get_medication_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<MedicationResponse>, AppError> {
    let graph = state.store.snapshot();
    get_medication(&graph, &name)
        .map(|med| Json(med.into()))
        .ok_or_else(|| AppError::entity_not_found(EntityKind::Medication, &name))
}

/// Look up an ingredient by name (case-insensitive).
#[utoipa::path(
    get,
    path = "/api/v1/ingredients/{name}",
    tag = "Entities",
    params(("name" = String, Path, description = "Ingredient name")),
    responses(
        (status = 200, description = "The ingredient", body = IngredientResponse),
        (status = 404, description = "No such ingredient", body = ApiError)
    )
)]
pub async fn get_ingredient_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<IngredientResponse>, AppError> {
    let graph = state.store.snapshot();
    get_ingredient(&graph, &name)
        .map(|ing| Json(ing.into()))
        .ok_or_else(|| AppError::entity_not_found(EntityKind::Ingredient, &name))
}

/// Look up an effect by name (case-insensitive).
#[utoipa::path(
    get,
    path = "/api/v1/effects/{name}",
    tag = "Entities",
    params(("name" = String, Path, description = "Effect name")),
    responses(
        (status = 200, description = "The effect", body = EffectResponse),
        (status = 404, description = "No such effect", body = ApiError)
    )
)]
pub async fn get_effect_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<EffectResponse>, AppError> {
    let graph = state.store.snapshot();
    get_effect(&graph, &name)
        .map(|eff| Json(eff.into()))
        .ok_or_else(|| AppError::entity_not_found(EntityKind::Effect, &name))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Fuzzy-search effects by name or description.
#[utoipa::path(
    get,
    path = "/api/v1/search",
    tag = "Search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching effects, best first", body = SearchResponse),
        (status = 400, description = "Empty query", body = ApiError)
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    state.total_searches.fetch_add(1, Ordering::Relaxed);
    let graph = state.store.snapshot();
    let matches = search_effects(&graph, &params.q, &state.search_config())
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    Ok(Json(SearchResponse {
        effects: matches.iter().map(|m| (&m.effect).into()).collect(),
    }))
}

// ---------------------------------------------------------------------------
// Graph & Merge
// ---------------------------------------------------------------------------

/// The full graph snapshot, as rendered by the visualization frontend.
#[utoipa::path(
    get,
    path = "/api/v1/graph",
    tag = "Graph",
    responses(
        (status = 200, description = "The full knowledge graph", body = GraphResponse)
    )
)]
pub async fn graph_handler(State(state): State<Arc<AppState>>) -> Json<GraphResponse> {
    let graph = state.store.snapshot();
    Json(GraphResponse::from(graph.as_ref()))
}

/// Merge a graph fragment: duplicates fold into existing entities, new
/// entities are created, and medication relationships propagate onto
/// ingredients and effects.
#[utoipa::path(
    post,
    path = "/api/v1/data",
    tag = "Graph",
    request_body = MergeRequest,
    responses(
        (status = 200, description = "Fragment merged", body = MergeResponse),
        (status = 400, description = "Body is not a fragment object", body = ApiError)
    )
)]
pub async fn merge_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, AppError> {
    state.total_merges.fetch_add(1, Ordering::Relaxed);
    let graph = state.store.merge(&body.into());
    Ok(Json(MergeResponse {
        message: "Data merged. Duplicates merged into existing; new entities created.".into(),
        medication_count: graph.medications.len(),
        ingredient_count: graph.ingredients.len(),
        effect_count: graph.effects.len(),
    }))
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Scan a medication label photo: the image goes to the vision provider, the
/// extracted fragment is merged into the graph.
#[utoipa::path(
    post,
    path = "/api/v1/scan",
    tag = "Scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Label recognized and merged", body = ScanResponse),
        (status = 400, description = "Invalid image or not a medication", body = ApiError),
        (status = 502, description = "Vision provider failure", body = ApiError),
        (status = 503, description = "No vision provider configured", body = ApiError)
    )
)]
pub async fn scan_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    state.total_scans.fetch_add(1, Ordering::Relaxed);

    let vision = state.vision.as_ref().ok_or_else(AppError::vision_unavailable)?;

    let (mime_type, payload) = parse_data_url(&body.image).ok_or_else(|| {
        AppError::bad_request("Invalid image format. Expected a base64 image data URL.")
    })?;
    // Reject payloads that are not actually base64 before spending a
    // provider round trip on them.
    use base64::Engine as _;
    if base64::engine::general_purpose::STANDARD
        .decode(payload.as_bytes())
        .is_err()
    {
        return Err(AppError::bad_request(
            "Invalid image payload: not valid base64.",
        ));
    }

    info!("Sending label image to vision provider for analysis");
    let raw = vision.analyze_label(&mime_type, &payload).await?;

    let fragment = match parse_scan_output(&raw) {
        Ok(ScanAnalysis::Fragment(fragment)) => fragment,
        Ok(ScanAnalysis::NotAMedication) => {
            info!("Vision provider reported: not a medication");
            return Err(AppError::not_a_medication());
        }
        Err(raw) => {
            warn!(
                "Vision output was not parseable as a fragment: {}",
                raw.chars().take(200).collect::<String>()
            );
            return Err(AppError::vision_failed(
                "Failed to parse the vision model output.",
            ));
        }
    };

    let echoed = serde_json::to_value(&fragment).unwrap_or_default();
    let graph = state.store.merge(&fragment);
    Ok(Json(ScanResponse {
        message: "Medication scanned and stored successfully".into(),
        data: echoed,
        medication_count: graph.medications.len(),
        ingredient_count: graph.ingredients.len(),
        effect_count: graph.effects.len(),
    }))
}
