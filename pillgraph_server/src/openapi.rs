//! OpenAPI 3.1 specification generation for the Pillgraph REST API.
//!
//! Uses utoipa to generate the spec from annotated handlers and types.
//! The spec is served at `/api/v1/openapi.json`.

use utoipa::OpenApi;

use crate::handlers;

/// OpenAPI specification for the Pillgraph REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pillgraph API",
        description = "Medication label scanner backend — vision extraction into a reconciled \
                       knowledge graph of medications, ingredients, and effects.",
        version = "0.1.0",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:5050", description = "Local development server")
    ),
    tags(
        (name = "Health", description = "Server health and metrics endpoints"),
        (name = "Entities", description = "Name-based entity lookups"),
        (name = "Search", description = "Fuzzy effect search over names and descriptions"),
        (name = "Graph", description = "Full graph reads and fragment merging"),
        (name = "Scan", description = "Label photo analysis via the vision provider")
    ),
    paths(
        handlers::health_handler,
        handlers::metrics_handler,
        handlers::get_medication_handler,
        handlers::get_ingredient_handler,
        handlers::get_effect_handler,
        handlers::search_handler,
        handlers::graph_handler,
        handlers::merge_handler,
        handlers::scan_handler,
    )
)]
pub struct ApiDoc;
