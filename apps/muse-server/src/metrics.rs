//! Prometheus metrics implementation.
//!
//! Implements the muse-observe `Meter` trait using prometheus-client and
//! maps the core's typed events onto counters and gauges.

use muse_observe::{
    Counter, Gauge, Histogram, IngestKind, Meter, ObsEvent, PersistKind,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter as PromCounter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge as PromGauge;
use prometheus_client::metrics::histogram::Histogram as PromHistogram;
use prometheus_client::registry::Registry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Prometheus metrics collector.
pub struct PrometheusMeter {
    registry: Arc<Mutex<Registry>>,
    counters: Arc<Mutex<HashMap<String, Family<Vec<(String, String)>, PromCounter>>>>,
    gauges: Arc<Mutex<HashMap<String, Family<Vec<(String, String)>, PromGauge>>>>,
    histograms: Arc<Mutex<HashMap<String, Family<Vec<(String, String)>, PromHistogram>>>>,
}

impl PrometheusMeter {
    /// Create a new Prometheus meter with a fresh registry.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            counters: Arc::new(Mutex::new(HashMap::new())),
            gauges: Arc::new(Mutex::new(HashMap::new())),
            histograms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let registry = self.registry.lock().unwrap();
        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();
        buffer
    }

    fn get_or_create_counter(&self, name: &str) -> Family<Vec<(String, String)>, PromCounter> {
        let mut counters = self.counters.lock().unwrap();

        if let Some(family) = counters.get(name) {
            return family.clone();
        }

        let family = Family::<Vec<(String, String)>, PromCounter>::default();

        let mut registry = self.registry.lock().unwrap();
        registry.register(name, "Counter", family.clone());

        counters.insert(name.to_string(), family.clone());
        family
    }

    fn get_or_create_gauge(&self, name: &str) -> Family<Vec<(String, String)>, PromGauge> {
        let mut gauges = self.gauges.lock().unwrap();

        if let Some(family) = gauges.get(name) {
            return family.clone();
        }

        let family = Family::<Vec<(String, String)>, PromGauge>::default();

        let mut registry = self.registry.lock().unwrap();
        registry.register(name, "Gauge", family.clone());

        gauges.insert(name.to_string(), family.clone());
        family
    }

    fn get_or_create_histogram(&self, name: &str) -> Family<Vec<(String, String)>, PromHistogram> {
        let mut histograms = self.histograms.lock().unwrap();

        if let Some(family) = histograms.get(name) {
            return family.clone();
        }

        let family = Family::<Vec<(String, String)>, PromHistogram>::new_with_constructor(|| {
            PromHistogram::new(prometheus_client::metrics::histogram::exponential_buckets(
                1.0, 2.0, 10,
            ))
        });

        let mut registry = self.registry.lock().unwrap();
        registry.register(name, "Histogram", family.clone());

        histograms.insert(name.to_string(), family.clone());
        family
    }

    fn inc(&self, name: &str) {
        self.get_or_create_counter(name).get_or_create(&vec![]).inc();
    }

    fn set(&self, name: &str, v: i64) {
        self.get_or_create_gauge(name).get_or_create(&vec![]).set(v);
    }

    fn observe(&self, name: &str, v: f64) {
        self.get_or_create_histogram(name)
            .get_or_create(&vec![])
            .observe(v);
    }
}

impl Default for PrometheusMeter {
    fn default() -> Self {
        Self::new()
    }
}

struct PrometheusCounter {
    counter: PromCounter,
}

impl Counter for PrometheusCounter {
    fn inc(&self, v: u64) {
        self.counter.inc_by(v);
    }
}

struct PrometheusGauge {
    gauge: PromGauge,
}

impl Gauge for PrometheusGauge {
    fn set(&self, v: i64) {
        self.gauge.set(v);
    }
}

struct PrometheusHistogram {
    histogram: PromHistogram,
}

impl Histogram for PrometheusHistogram {
    fn observe(&self, v: f64) {
        self.histogram.observe(v);
    }
}

impl Meter for PrometheusMeter {
    fn counter(
        &self,
        name: &'static str,
        labels: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Counter> {
        let family = self.get_or_create_counter(name);

        let label_vec: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let counter = family.get_or_create(&label_vec).clone();

        Box::new(PrometheusCounter { counter })
    }

    fn gauge(
        &self,
        name: &'static str,
        labels: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Gauge> {
        let family = self.get_or_create_gauge(name);

        let label_vec: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let gauge = family.get_or_create(&label_vec).clone();

        Box::new(PrometheusGauge { gauge })
    }

    fn histo(
        &self,
        name: &'static str,
        _buckets: &'static [f64],
        labels: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Histogram> {
        let family = self.get_or_create_histogram(name);

        let label_vec: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let histogram = family.get_or_create(&label_vec).clone();

        Box::new(PrometheusHistogram { histogram })
    }

    fn emit(&self, evt: ObsEvent) {
        match evt {
            ObsEvent::Ingest(e) => match e.kind {
                IngestKind::Upsert { .. } => self.inc("muse_ingest_upserts_total"),
                IngestKind::DeleteArtwork => self.inc("muse_ingest_artwork_deletes_total"),
                IngestKind::DeleteDescriptor => self.inc("muse_ingest_descriptor_deletes_total"),
                IngestKind::DimensionLocked { dimension } => {
                    self.set("muse_descriptor_dimension", dimension as i64)
                }
                IngestKind::Rejected => self.inc("muse_ingest_rejected_total"),
            },
            ObsEvent::Match(e) => {
                self.inc("muse_match_requests_total");
                self.observe("muse_match_candidates", e.candidates as f64);
                if e.returned > 0 {
                    self.inc("muse_match_hits_total");
                }
            }
            ObsEvent::Snapshot(e) => {
                self.set("muse_snapshot_version", e.version as i64);
                self.set("muse_catalog_artworks", e.artworks as i64);
                self.set("muse_catalog_descriptors", e.descriptors as i64);
            }
            ObsEvent::Persist(e) => match e.kind {
                PersistKind::Loaded { .. } => self.inc("muse_catalog_loads_total"),
                PersistKind::Committed { ms } => {
                    self.observe("muse_catalog_commit_ms", ms as f64)
                }
                PersistKind::Failed => self.inc("muse_catalog_commit_failures_total"),
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_observe::{IngestEvt, SnapshotEvt};

    #[test]
    fn test_counter() {
        let meter = PrometheusMeter::new();
        let counter = meter.counter("test_counter", &[("label", "value")]);
        counter.inc(5);
        counter.inc(3);

        let output = meter.export();
        assert!(output.contains("test_counter"));
    }

    #[test]
    fn test_gauge() {
        let meter = PrometheusMeter::new();
        let gauge = meter.gauge("test_gauge", &[("label", "value")]);
        gauge.set(42);

        let output = meter.export();
        assert!(output.contains("test_gauge"));
    }

    #[test]
    fn test_events_map_to_metrics() {
        let meter = PrometheusMeter::new();

        meter.emit(ObsEvent::Ingest(IngestEvt {
            kind: IngestKind::Upsert { descriptors: 2 },
        }));
        meter.emit(ObsEvent::Snapshot(SnapshotEvt {
            version: 7,
            artworks: 3,
            descriptors: 9,
        }));

        let output = meter.export();
        assert!(output.contains("muse_ingest_upserts_total"));
        assert!(output.contains("muse_snapshot_version"));
        assert!(output.contains("muse_catalog_artworks"));
    }
}
