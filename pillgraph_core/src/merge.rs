//! Merge engine: reconciles an incoming partial graph against the full graph.
//!
//! The scan pipeline produces loosely structured, possibly duplicated,
//! case-varying fragments. This module folds them into a consistent state:
//!
//! 1. **Identity resolution** — duplicate detection by case-insensitive name
//!    (see [`canonical_key`]).
//! 2. **Union merging** — relationship arrays become the case-insensitive
//!    union of existing and incoming entries, existing order first,
//!    first-occurrence casing preserved.
//! 3. **Forward propagation** — a medication's ingredient/effect references
//!    create or update the reverse entries on those entities.
//!
//! Propagation is deliberately one-directional: ingredient and effect entries
//! merged directly do NOT push their medication lists back onto medications.
//! Tests pin this asymmetry.
//!
//! The engine never errors on data-shape surprises. Entries that are missing
//! a name or fail to decode are skipped with a debug log; only the caller's
//! top-level input validation can reject a fragment.

use serde_json::Value;
use tracing::debug;

use crate::types::{
    canonical_key, Effect, EffectFragment, GraphFragment, Ingredient, IngredientFragment,
    MedGraph, Medication, MedicationFragment,
};

/// Merge a fragment into `graph` in place.
///
/// Medications are processed first (with forward propagation), then
/// ingredients, then effects. Callers wanting atomic publication should run
/// this against a working copy and swap afterwards, which is what
/// [`GraphStore::merge`](crate::store::GraphStore::merge) does.
pub fn merge_fragment(graph: &mut MedGraph, fragment: &GraphFragment) {
    for (entry_key, value) in &fragment.medications {
        match decode_entry::<MedicationFragment>(entry_key, value) {
            Some(med) => merge_medication(graph, &med),
            None => continue,
        }
    }
    for (entry_key, value) in &fragment.ingredients {
        match decode_entry::<IngredientFragment>(entry_key, value) {
            Some(ing) => merge_ingredient(graph, &ing),
            None => continue,
        }
    }
    for (entry_key, value) in &fragment.effects {
        match decode_entry::<EffectFragment>(entry_key, value) {
            Some(eff) => merge_effect(graph, &eff),
            None => continue,
        }
    }
}

/// Decode one mapping entry leniently; a malformed entry is skipped, not fatal.
fn decode_entry<T: serde::de::DeserializeOwned>(entry_key: &str, value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            debug!("Skipping malformed fragment entry '{}': {}", entry_key, e);
            None
        }
    }
}

/// Case-insensitive union of two name lists.
///
/// Keeps `existing` elements first in their original order, then appends
/// `incoming` elements not already present. Each element is trimmed; blanks
/// are dropped and the first occurrence's casing is kept.
pub fn union_names(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    let mut seen: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    for name in existing.iter().chain(incoming.iter()) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let folded = trimmed.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(trimmed.to_string());
    }
    out
}

/// Whether `list` contains `name` under case-insensitive comparison.
fn contains_name(list: &[String], name: &str) -> bool {
    let folded = name.trim().to_lowercase();
    list.iter().any(|n| n.trim().to_lowercase() == folded)
}

fn merge_medication(graph: &mut MedGraph, incoming: &MedicationFragment) {
    let name_norm = incoming.name.trim();
    if name_norm.is_empty() {
        debug!("Skipping medication entry with empty name");
        return;
    }
    let key = canonical_key(name_norm);

    let merged = match graph.medications.get(&key) {
        Some(existing) => Medication {
            // Incoming normalized casing wins as the stored display name.
            name: name_norm.to_string(),
            ingredients: union_names(&existing.ingredients, &incoming.ingredients),
            side_effects: union_names(&existing.side_effects, &incoming.side_effects),
            symptoms_treated: union_names(&existing.symptoms_treated, &incoming.symptoms_treated),
        },
        None => Medication {
            name: name_norm.to_string(),
            ingredients: union_names(&[], &incoming.ingredients),
            side_effects: union_names(&[], &incoming.side_effects),
            symptoms_treated: union_names(&[], &incoming.symptoms_treated),
        },
    };

    // Forward propagation: ensure the reverse entries exist and reference
    // this medication. Runs over the merged arrays so re-merges stay
    // idempotent.
    for ingredient in merged.ingredients.clone() {
        link_ingredient(graph, &ingredient, &merged.name);
    }
    for effect in merged.side_effects.clone() {
        link_effect_causing(graph, &effect, &merged.name);
    }
    for effect in merged.symptoms_treated.clone() {
        link_effect_treating(graph, &effect, &merged.name);
    }

    graph.medications.insert(key, merged);
}

fn merge_ingredient(graph: &mut MedGraph, incoming: &IngredientFragment) {
    let name_norm = incoming.name.trim();
    if name_norm.is_empty() {
        debug!("Skipping ingredient entry with empty name");
        return;
    }
    let key = canonical_key(name_norm);

    let updated = match graph.ingredients.get(&key) {
        Some(existing) => Ingredient {
            name: name_norm.to_string(),
            medications: union_names(&existing.medications, &incoming.medications),
            description: match &incoming.description {
                Some(desc) => Some(desc.clone()),
                None => existing.description.clone(),
            },
        },
        None => Ingredient {
            name: name_norm.to_string(),
            medications: union_names(&[], &incoming.medications),
            description: incoming.description.clone(),
        },
    };

    // No propagation back onto medications: ingredient-side merges record
    // the claim without rewriting medication ingredient lists.
    graph.ingredients.insert(key, updated);
}

fn merge_effect(graph: &mut MedGraph, incoming: &EffectFragment) {
    let name_norm = incoming.name.trim();
    if name_norm.is_empty() {
        debug!("Skipping effect entry with empty name");
        return;
    }
    let key = canonical_key(name_norm);

    let updated = match graph.effects.get(&key) {
        Some(existing) => Effect {
            name: name_norm.to_string(),
            medications_causing_it: union_names(
                &existing.medications_causing_it,
                &incoming.medications_causing_it,
            ),
            medications_treating_it: union_names(
                &existing.medications_treating_it,
                &incoming.medications_treating_it,
            ),
            description: match &incoming.description {
                Some(desc) => Some(desc.clone()),
                None => existing.description.clone(),
            },
        },
        None => Effect {
            name: name_norm.to_string(),
            medications_causing_it: union_names(&[], &incoming.medications_causing_it),
            medications_treating_it: union_names(&[], &incoming.medications_treating_it),
            description: incoming.description.clone(),
        },
    };

    graph.effects.insert(key, updated);
}

/// Ensure an ingredient entity exists and lists `med_name` as a container.
fn link_ingredient(graph: &mut MedGraph, ingredient_name: &str, med_name: &str) {
    let key = canonical_key(ingredient_name);
    let entry = graph.ingredients.entry(key).or_insert_with(|| Ingredient {
        name: ingredient_name.trim().to_string(),
        ..Default::default()
    });
    if !contains_name(&entry.medications, med_name) {
        entry.medications.push(med_name.to_string());
    }
}

/// Ensure an effect entity exists and lists `med_name` as a cause.
fn link_effect_causing(graph: &mut MedGraph, effect_name: &str, med_name: &str) {
    let key = canonical_key(effect_name);
    let entry = graph.effects.entry(key).or_insert_with(|| Effect {
        name: effect_name.trim().to_string(),
        ..Default::default()
    });
    if !contains_name(&entry.medications_causing_it, med_name) {
        entry.medications_causing_it.push(med_name.to_string());
    }
}

/// Ensure an effect entity exists and lists `med_name` as a treatment.
fn link_effect_treating(graph: &mut MedGraph, effect_name: &str, med_name: &str) {
    let key = canonical_key(effect_name);
    let entry = graph.effects.entry(key).or_insert_with(|| Effect {
        name: effect_name.trim().to_string(),
        ..Default::default()
    });
    if !contains_name(&entry.medications_treating_it, med_name) {
        entry.medications_treating_it.push(med_name.to_string());
    }
}
