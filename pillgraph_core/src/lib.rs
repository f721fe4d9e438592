//! # Pillgraph Core
//!
//! The medication knowledge graph: data model, merge/reconciliation engine,
//! query surface, and snapshot persistence.
//!
//! The scan pipeline (in `pillgraph_server`) turns label photos into partial
//! graph fragments; this crate folds those fragments into a consistent
//! three-way graph (medications ↔ ingredients, medications ↔ effects) while
//! preserving referential consistency across repeated scans.
//!
//! Entry points:
//! - [`GraphStore`] — owns the authoritative graph; load at startup, merge
//!   fragments, read consistent snapshots.
//! - [`merge::merge_fragment`] — the reconciliation engine itself, usable
//!   against any `&mut MedGraph`.
//! - [`query`] — point lookups and fuzzy effect search.

pub mod merge;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod types;

pub use merge::{merge_fragment, union_names};
pub use query::{
    get_effect, get_ingredient, get_medication, search_effects, EffectMatch, SearchConfig,
    SearchError,
};
pub use store::GraphStore;
pub use types::{
    canonical_key, Effect, EffectFragment, EntityKind, GraphFragment, Ingredient,
    IngredientFragment, MedGraph, Medication, MedicationFragment,
};
