//! Health checks.
//!
//! The quick check gates load balancers on cache readiness; the full check
//! reports catalog shape for dashboards.

use muse_store::DescriptorStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Health status for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHealthStatus {
    /// Overall status: "healthy" or "starting"
    pub status: String,

    /// Whether the catalog cache has completed its initial load
    pub ready: bool,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Number of artworks in the current snapshot
    pub artworks: usize,

    /// Number of descriptors in the current snapshot
    pub descriptors: usize,

    /// Locked vector dimensionality, if any descriptor was ever inserted
    pub dimension: Option<usize>,

    /// Version of the current snapshot
    pub snapshot_version: Option<u64>,
}

/// Health check service.
pub struct HealthChecker {
    store: Arc<DescriptorStore>,
    started_at: Instant,
}

impl HealthChecker {
    pub fn new(store: Arc<DescriptorStore>) -> Self {
        Self {
            store,
            started_at: Instant::now(),
        }
    }

    /// Full health status.
    pub fn check(&self) -> ServerHealthStatus {
        let uptime_seconds = self.started_at.elapsed().as_secs();

        match self.store.snapshot() {
            Ok(snapshot) => ServerHealthStatus {
                status: "healthy".to_string(),
                ready: true,
                uptime_seconds,
                artworks: snapshot.artwork_count(),
                descriptors: snapshot.descriptor_count(),
                dimension: snapshot.dimension(),
                snapshot_version: Some(snapshot.version()),
            },
            // Cache not loaded yet: report starting, never a fake empty
            // catalog
            Err(_) => ServerHealthStatus {
                status: "starting".to_string(),
                ready: false,
                uptime_seconds,
                artworks: 0,
                descriptors: 0,
                dimension: None,
                snapshot_version: None,
            },
        }
    }

    /// Fast readiness probe.
    pub fn check_quick(&self) -> bool {
        self.store.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_store::MemoryCatalog;

    #[test]
    fn test_starting_until_loaded() {
        let store = Arc::new(DescriptorStore::new(Box::new(MemoryCatalog::new())));
        let checker = HealthChecker::new(Arc::clone(&store));

        assert!(!checker.check_quick());
        assert_eq!(checker.check().status, "starting");
        assert_eq!(checker.check().snapshot_version, None);

        store.load().unwrap();

        assert!(checker.check_quick());
        let status = checker.check();
        assert_eq!(status.status, "healthy");
        assert!(status.ready);
    }

    #[test]
    fn test_reports_catalog_shape() {
        let store = Arc::new(DescriptorStore::in_memory());
        store
            .upsert_artwork(
                "a",
                serde_json::Value::Null,
                vec![("d1".to_string(), vec![1.0, 0.0]), ("d2".to_string(), vec![0.0, 1.0])],
            )
            .unwrap();

        let checker = HealthChecker::new(store);
        let status = checker.check();

        assert_eq!(status.artworks, 1);
        assert_eq!(status.descriptors, 2);
        assert_eq!(status.dimension, Some(2));
    }
}
