//! Application state shared across all request handlers.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use pillgraph_config::PillgraphConfig;
use pillgraph_core::{GraphStore, SearchConfig};

use crate::vision::VisionClient;

/// Shared application state threaded through Axum handlers.
///
/// Wrapped in `Arc` and shared via Axum's `State` extractor. The graph store
/// serializes merges internally, so handlers never need their own locking.
pub struct AppState {
    /// The authoritative knowledge graph.
    pub store: Arc<GraphStore>,
    /// Vision provider for label analysis. `None` when no API key is
    /// configured; the scan endpoint then reports the capability unavailable.
    pub vision: Option<Arc<dyn VisionClient>>,
    /// Full configuration.
    pub config: PillgraphConfig,
    /// Server start time (for uptime metric).
    pub start_time: Instant,
    /// Request counters for metrics.
    pub total_requests: AtomicU64,
    pub total_scans: AtomicU64,
    pub total_merges: AtomicU64,
    pub total_searches: AtomicU64,
}

impl AppState {
    pub fn new(
        store: Arc<GraphStore>,
        vision: Option<Arc<dyn VisionClient>>,
        config: PillgraphConfig,
    ) -> Self {
        Self {
            store,
            vision,
            config,
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_scans: AtomicU64::new(0),
            total_merges: AtomicU64::new(0),
            total_searches: AtomicU64::new(0),
        }
    }

    /// Search configuration derived from the `[search]` section.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            threshold: self.config.search.threshold,
        }
    }
}
