//! The process-wide graph store.
//!
//! One `GraphStore` owns the authoritative in-memory graph. Lifecycle:
//! initialize from the snapshot at startup, mutate only through [`merge`],
//! persist after every mutation.
//!
//! # Concurrency
//!
//! Merges are serialized by a dedicated mutex — the union-and-propagate
//! sequence is a read-modify-write that would lose updates if two merges
//! interleaved. Each merge mutates a private working copy and publishes it
//! by swapping an `Arc` under a write lock, so readers observe either the
//! pre- or post-merge graph, never a partially updated one.
//!
//! [`merge`]: GraphStore::merge

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use crate::merge::merge_fragment;
use crate::snapshot;
use crate::types::{GraphFragment, MedGraph};

/// Owner of the authoritative graph and its snapshot path.
#[derive(Debug)]
pub struct GraphStore {
    path: PathBuf,
    graph: RwLock<Arc<MedGraph>>,
    merge_lock: Mutex<()>,
}

impl GraphStore {
    /// Open the store, loading the snapshot at `path`.
    ///
    /// A missing or malformed snapshot starts the store empty (fails open).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let graph = snapshot::load(&path);
        info!(
            "Graph store loaded from {}: {} medications, {} ingredients, {} effects",
            path.display(),
            graph.medications.len(),
            graph.ingredients.len(),
            graph.effects.len(),
        );
        Self {
            path,
            graph: RwLock::new(Arc::new(graph)),
            merge_lock: Mutex::new(()),
        }
    }

    /// A consistent read snapshot of the current graph.
    pub fn snapshot(&self) -> Arc<MedGraph> {
        self.graph.read().unwrap().clone()
    }

    /// Merge a fragment and persist the result, returning the updated graph.
    ///
    /// The snapshot write is synchronous and best-effort: on failure the
    /// in-memory graph stays authoritative and the error is logged, not
    /// propagated.
    pub fn merge(&self, fragment: &GraphFragment) -> Arc<MedGraph> {
        let _writer = self.merge_lock.lock().unwrap();

        let mut working = MedGraph::clone(&self.snapshot());
        merge_fragment(&mut working, fragment);
        let published = Arc::new(working);
        *self.graph.write().unwrap() = Arc::clone(&published);

        if let Err(e) = snapshot::save(&self.path, &published) {
            warn!(
                "Failed to persist snapshot {} (in-memory graph remains authoritative): {:#}",
                self.path.display(),
                e
            );
        }

        published
    }

    /// Snapshot file path (for diagnostics).
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(json: &str) -> GraphFragment {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn merge_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let store = GraphStore::open(&path);
        store.merge(&fragment(
            r#"{"medications":{"m":{"name":"Advil","ingredients":["Ibuprofen"]}}}"#,
        ));

        // A second store opened on the same path sees the persisted state.
        let reopened = GraphStore::open(&path);
        let graph = reopened.snapshot();
        assert!(graph.medications.contains_key("advil"));
        assert!(graph.ingredients.contains_key("ibuprofen"));
    }

    #[test]
    fn readers_see_pre_or_post_merge_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.json"));

        let before = store.snapshot();
        let after = store.merge(&fragment(r#"{"medications":{"m":{"name":"Advil"}}}"#));

        // The pre-merge snapshot is unaffected by the published update.
        assert!(before.medications.is_empty());
        assert!(after.medications.contains_key("advil"));
        assert!(store.snapshot().medications.contains_key("advil"));
    }

    #[test]
    fn save_failure_keeps_in_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A snapshot path that is a directory makes the rename fail.
        let path = dir.path().join("graph.json");
        std::fs::create_dir_all(&path).unwrap();

        let store = GraphStore::open(&path);
        let graph = store.merge(&fragment(r#"{"medications":{"m":{"name":"Advil"}}}"#));
        assert!(graph.medications.contains_key("advil"));
        assert!(store.snapshot().medications.contains_key("advil"));
    }

    #[test]
    fn sequential_merges_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.json"));

        store.merge(&fragment(r#"{"medications":{"m":{"name":"Advil"}}}"#));
        store.merge(&fragment(r#"{"medications":{"m":{"name":"Tylenol"}}}"#));

        let graph = store.snapshot();
        assert_eq!(graph.medications.len(), 2);
    }
}
