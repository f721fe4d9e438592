//! JSON request/response types for the Pillgraph REST API.

use std::collections::BTreeMap;

use pillgraph_core::{Effect, GraphFragment, Ingredient, MedGraph, Medication};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ---------------------------------------------------------------------------
// Health & Metrics
// ---------------------------------------------------------------------------

/// GET /api/v1/health — response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Configured vision provider name.
    pub vision_provider: String,
    /// Whether the vision provider is ready (API key present).
    pub vision_ready: bool,
    /// Snapshot file backing the graph store.
    pub snapshot_path: String,
}

/// GET /api/v1/metrics — response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricsResponse {
    pub total_requests: u64,
    pub total_scans: u64,
    pub total_merges: u64,
    pub total_searches: u64,
    pub uptime_secs: u64,
    pub medication_count: usize,
    pub ingredient_count: usize,
    pub effect_count: usize,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A medication as returned by lookups and the graph endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicationResponse {
    pub name: String,
    pub ingredients: Vec<String>,
    pub side_effects: Vec<String>,
    pub symptoms_treated: Vec<String>,
}

impl From<&Medication> for MedicationResponse {
    fn from(med: &Medication) -> Self {
        Self {
            name: med.name.clone(),
            ingredients: med.ingredients.clone(),
            side_effects: med.side_effects.clone(),
            symptoms_treated: med.symptoms_treated.clone(),
        }
    }
}

/// An ingredient as returned by lookups and the graph endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientResponse {
    pub name: String,
    pub medications: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Ingredient> for IngredientResponse {
    fn from(ing: &Ingredient) -> Self {
        Self {
            name: ing.name.clone(),
            medications: ing.medications.clone(),
            description: ing.description.clone(),
        }
    }
}

/// An effect as returned by lookups, search, and the graph endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectResponse {
    pub name: String,
    pub medications_causing_it: Vec<String>,
    pub medications_treating_it: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Effect> for EffectResponse {
    fn from(eff: &Effect) -> Self {
        Self {
            name: eff.name.clone(),
            medications_causing_it: eff.medications_causing_it.clone(),
            medications_treating_it: eff.medications_treating_it.clone(),
            description: eff.description.clone(),
        }
    }
}

/// GET /api/v1/graph — the full graph snapshot for visualization.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GraphResponse {
    pub medications: BTreeMap<String, MedicationResponse>,
    pub ingredients: BTreeMap<String, IngredientResponse>,
    pub effects: BTreeMap<String, EffectResponse>,
}

impl From<&MedGraph> for GraphResponse {
    fn from(graph: &MedGraph) -> Self {
        Self {
            medications: graph
                .medications
                .iter()
                .map(|(k, v)| (k.clone(), v.into()))
                .collect(),
            ingredients: graph
                .ingredients
                .iter()
                .map(|(k, v)| (k.clone(), v.into()))
                .collect(),
            effects: graph
                .effects
                .iter()
                .map(|(k, v)| (k.clone(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// POST /api/v1/data — request body.
///
/// Each kind maps arbitrary keys to entity-shaped objects; the keys are
/// ignored, only each object's `name` field determines identity.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MergeRequest {
    #[serde(default)]
    pub medications: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub ingredients: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub effects: BTreeMap<String, serde_json::Value>,
}

impl From<MergeRequest> for GraphFragment {
    fn from(req: MergeRequest) -> Self {
        GraphFragment {
            medications: req.medications,
            ingredients: req.ingredients,
            effects: req.effects,
        }
    }
}

/// POST /api/v1/data — response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MergeResponse {
    pub message: String,
    pub medication_count: usize,
    pub ingredient_count: usize,
    pub effect_count: usize,
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// POST /api/v1/scan — request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Base64 data URL of the label photo (`data:image/...;base64,...`).
    pub image: String,
}

/// POST /api/v1/scan — response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScanResponse {
    pub message: String,
    /// The fragment the vision model extracted, as merged.
    pub data: serde_json::Value,
    pub medication_count: usize,
    pub ingredient_count: usize,
    pub effect_count: usize,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// GET /api/v1/search — query parameters.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Search text matched against effect names and descriptions.
    #[serde(default)]
    pub q: String,
}

/// GET /api/v1/search — response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// Matching effects, ordered by descending relevance.
    pub effects: Vec<EffectResponse>,
}
