//! Core data types for the Pillgraph knowledge graph.
//!
//! Defines the three entity kinds (medications, ingredients, effects), the
//! full graph container, and the partial-graph fragment shape submitted by
//! the scan pipeline for merging.
//!
//! # Identity
//!
//! Entities carry no synthetic IDs. Each entity is keyed by its **canonical
//! key**: the trimmed, case-folded form of its display name. Within one kind
//! no two stored entities may have names that compare equal
//! case-insensitively; the maps in [`MedGraph`] enforce this by construction
//! because `canonical_key(record.name) == map key` holds for every record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical identity form of an entity name: trimmed and case-folded.
///
/// Returns an empty string for blank input; callers treat that as "no
/// identity" and skip the record.
pub fn canonical_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A medication as extracted from a label scan.
///
/// Relationship arrays are order-preserving, case-insensitively deduplicated
/// sequences of entity display names. The first occurrence's casing is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Display name (normalized incoming casing from the most recent merge).
    pub name: String,
    /// Names of ingredients this medication contains.
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Names of effects this medication can cause.
    #[serde(default)]
    pub side_effects: Vec<String>,
    /// Names of effects (symptoms) this medication treats.
    #[serde(default)]
    pub symptoms_treated: Vec<String>,
}

/// An active ingredient, with back-references to the medications containing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    /// Display name.
    pub name: String,
    /// Names of medications containing this ingredient.
    #[serde(default)]
    pub medications: Vec<String>,
    /// Free-text description. Last write wins; only an explicitly provided
    /// incoming value overwrites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A side effect or treated symptom, with back-references to medications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    /// Display name.
    pub name: String,
    /// Names of medications that cause this effect.
    #[serde(default)]
    pub medications_causing_it: Vec<String>,
    /// Names of medications that treat this effect.
    #[serde(default)]
    pub medications_treating_it: Vec<String>,
    /// Free-text description. Last write wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The full three-way knowledge graph.
///
/// Maps are keyed by [`canonical_key`] of each record's name. `BTreeMap`
/// keeps snapshot serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedGraph {
    #[serde(default)]
    pub medications: BTreeMap<String, Medication>,
    #[serde(default)]
    pub ingredients: BTreeMap<String, Ingredient>,
    #[serde(default)]
    pub effects: BTreeMap<String, Effect>,
}

impl MedGraph {
    /// Resolve a medication name to its stored canonical key.
    ///
    /// Trims the input; blank input resolves to `None`. The returned key may
    /// differ in case from the query — identity is case-insensitive.
    pub fn resolve_medication(&self, name: &str) -> Option<&str> {
        let key = canonical_key(name);
        if key.is_empty() {
            return None;
        }
        self.medications.get_key_value(&key).map(|(k, _)| k.as_str())
    }

    /// Resolve an ingredient name to its stored canonical key.
    pub fn resolve_ingredient(&self, name: &str) -> Option<&str> {
        let key = canonical_key(name);
        if key.is_empty() {
            return None;
        }
        self.ingredients.get_key_value(&key).map(|(k, _)| k.as_str())
    }

    /// Resolve an effect name to its stored canonical key.
    pub fn resolve_effect(&self, name: &str) -> Option<&str> {
        let key = canonical_key(name);
        if key.is_empty() {
            return None;
        }
        self.effects.get_key_value(&key).map(|(k, _)| k.as_str())
    }

    /// Total entity count across all three kinds.
    pub fn entity_count(&self) -> usize {
        self.medications.len() + self.ingredients.len() + self.effects.len()
    }
}

/// Entity kind discriminator, used for lookups and not-found reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Medication,
    Ingredient,
    Effect,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Medication => f.write_str("medication"),
            EntityKind::Ingredient => f.write_str("ingredient"),
            EntityKind::Effect => f.write_str("effect"),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound fragment shapes
// ---------------------------------------------------------------------------

/// A partial graph submitted for merging.
///
/// Each kind is a mapping from arbitrary keys to entity-like JSON objects.
/// The mapping's own keys are ignored — only each object's `name` field
/// determines identity. Values are held as raw JSON and decoded per entry so
/// that one malformed entry never aborts the whole merge.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphFragment {
    #[serde(default)]
    pub medications: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub ingredients: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub effects: BTreeMap<String, serde_json::Value>,
}

impl GraphFragment {
    /// Whether the fragment carries no entries at all.
    pub fn is_empty(&self) -> bool {
        self.medications.is_empty() && self.ingredients.is_empty() && self.effects.is_empty()
    }
}

/// Entity-shaped medication entry inside a [`GraphFragment`].
///
/// Every field is defaulted: absent arrays merge as empty, an absent name
/// marks the entry as skippable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationFragment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub symptoms_treated: Vec<String>,
}

/// Entity-shaped ingredient entry inside a [`GraphFragment`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientFragment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub medications: Vec<String>,
    /// `None` when the field is absent (existing description is kept);
    /// `Some` — even `Some("")` — overwrites.
    #[serde(default)]
    pub description: Option<String>,
}

/// Entity-shaped effect entry inside a [`GraphFragment`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectFragment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub medications_causing_it: Vec<String>,
    #[serde(default)]
    pub medications_treating_it: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}
