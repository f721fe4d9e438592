//! Snapshot persistence: the whole graph as a single JSON document.
//!
//! Loading fails open — a missing, unreadable, or malformed snapshot yields
//! an empty graph and a warning, never an error. Saving writes the document
//! to a temporary sibling file and renames it over the snapshot so a crash
//! mid-write cannot corrupt the previous one.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::merge::union_names;
use crate::types::{canonical_key, MedGraph};

/// Load a graph snapshot from `path`.
///
/// On any failure returns an empty three-map graph. A successfully parsed
/// snapshot is normalized: records are re-keyed under the canonical form of
/// their name (upgrading legacy snapshots keyed by display name), records
/// with blank names are dropped, and relationship arrays are deduplicated.
/// Missing arrays and descriptions already default during deserialization.
pub fn load(path: &Path) -> MedGraph {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return MedGraph::default();
        }
        Err(e) => {
            warn!("Failed to read snapshot {}: {}", path.display(), e);
            return MedGraph::default();
        }
    };

    match serde_json::from_str::<MedGraph>(&raw) {
        Ok(graph) => normalize(graph),
        Err(e) => {
            warn!(
                "Snapshot {} is malformed, starting from an empty graph: {}",
                path.display(),
                e
            );
            MedGraph::default()
        }
    }
}

/// Save the full graph as one pretty-printed JSON document.
///
/// The write goes to a `.tmp` sibling first and is renamed into place.
/// Callers decide whether a failure is fatal; the store logs and swallows it.
pub fn save(path: &Path, graph: &MedGraph) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create snapshot directory {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(graph).context("Failed to serialize graph")?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .with_context(|| format!("Failed to write snapshot temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move snapshot into place at {}", path.display()))?;
    Ok(())
}

/// Defensive upgrade of a freshly loaded snapshot.
fn normalize(graph: MedGraph) -> MedGraph {
    let mut out = MedGraph::default();

    for (_, mut med) in graph.medications {
        let key = canonical_key(&med.name);
        if key.is_empty() {
            continue;
        }
        med.name = med.name.trim().to_string();
        med.ingredients = union_names(&med.ingredients, &[]);
        med.side_effects = union_names(&med.side_effects, &[]);
        med.symptoms_treated = union_names(&med.symptoms_treated, &[]);
        out.medications.insert(key, med);
    }
    for (_, mut ing) in graph.ingredients {
        let key = canonical_key(&ing.name);
        if key.is_empty() {
            continue;
        }
        ing.name = ing.name.trim().to_string();
        ing.medications = union_names(&ing.medications, &[]);
        out.ingredients.insert(key, ing);
    }
    for (_, mut eff) in graph.effects {
        let key = canonical_key(&eff.name);
        if key.is_empty() {
            continue;
        }
        eff.name = eff.name.trim().to_string();
        eff.medications_causing_it = union_names(&eff.medications_causing_it, &[]);
        eff.medications_treating_it = union_names(&eff.medications_treating_it, &[]);
        out.effects.insert(key, eff);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let graph = load(&dir.path().join("absent.json"));
        assert_eq!(graph, MedGraph::default());
    }

    #[test]
    fn invalid_json_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, "{not valid json").unwrap();
        assert_eq!(load(&path), MedGraph::default());
    }

    #[test]
    fn schema_mismatch_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, r#"{"medications": "oops"}"#).unwrap();
        assert_eq!(load(&path), MedGraph::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("graph.json");

        let mut graph = MedGraph::default();
        crate::merge::merge_fragment(
            &mut graph,
            &serde_json::from_str(
                r#"{"medications":{"m":{"name":"Advil","ingredients":["Ibuprofen"]}}}"#,
            )
            .unwrap(),
        );

        save(&path, &graph).unwrap();
        assert_eq!(load(&path), graph);
        // The temp file must not linger.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn legacy_snapshot_missing_arrays_is_upgraded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        // Older snapshots stored display-name keys and omitted empty arrays.
        fs::write(
            &path,
            r#"{
                "medications": {"Advil": {"name": "Advil"}},
                "ingredients": {"Ibuprofen": {"name": "Ibuprofen"}},
                "effects": {"Headache": {"name": "Headache"}}
            }"#,
        )
        .unwrap();

        let graph = load(&path);
        assert!(graph.medications.contains_key("advil"));
        let ing = &graph.ingredients["ibuprofen"];
        assert!(ing.medications.is_empty());
        let eff = &graph.effects["headache"];
        assert!(eff.medications_causing_it.is_empty());
        assert!(eff.medications_treating_it.is_empty());
    }

    #[test]
    fn normalize_drops_blank_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(
            &path,
            r#"{"medications": {"weird": {"name": "   "}, "ok": {"name": "Advil"}}}"#,
        )
        .unwrap();
        let graph = load(&path);
        assert_eq!(graph.medications.len(), 1);
        assert!(graph.medications.contains_key("advil"));
    }
}
