//! muse-observe: vendor-neutral observability ABI.
//!
//! Core crates depend only on these traits and event types. Backends live
//! elsewhere (the server ships a Prometheus one).

pub trait Counter: Send + Sync {
    fn inc(&self, v: u64);
}
pub trait Gauge: Send + Sync {
    fn set(&self, v: i64);
}
pub trait Histogram: Send + Sync {
    fn observe(&self, v: f64);
}

pub trait Meter: Send + Sync + 'static {
    fn counter(
        &self,
        name: &'static str,
        labels: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Counter>;
    fn gauge(
        &self,
        name: &'static str,
        labels: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Gauge>;
    fn histo(
        &self,
        name: &'static str,
        _buckets: &'static [f64],
        labels: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Histogram>;
    fn emit(&self, evt: ObsEvent);
}

/// A do-nothing meter for tests and users who don't care about telemetry.
#[derive(Clone, Default)]
pub struct NoopMeter;
struct NoopC;
impl Counter for NoopC {
    fn inc(&self, _v: u64) {}
}
struct NoopG;
impl Gauge for NoopG {
    fn set(&self, _v: i64) {}
}
struct NoopH;
impl Histogram for NoopH {
    fn observe(&self, _v: f64) {}
}
impl Meter for NoopMeter {
    fn counter(
        &self,
        _n: &'static str,
        _l: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Counter> {
        Box::new(NoopC)
    }
    fn gauge(
        &self,
        _n: &'static str,
        _l: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Gauge> {
        Box::new(NoopG)
    }
    fn histo(
        &self,
        _n: &'static str,
        _b: &'static [f64],
        _l: &'static [(&'static str, &'static str)],
    ) -> Box<dyn Histogram> {
        Box::new(NoopH)
    }
    fn emit(&self, _e: ObsEvent) {}
}

/// Typed events for live visibility (vectors and metadata never included).
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ObsEvent {
    Ingest(IngestEvt),
    Match(MatchEvt),
    Snapshot(SnapshotEvt),
    Persist(PersistEvt),
}

#[derive(Clone, Debug)]
pub struct IngestEvt {
    pub kind: IngestKind,
}
#[derive(Clone, Debug)]
pub enum IngestKind {
    Upsert { descriptors: usize },
    DeleteArtwork,
    DeleteDescriptor,
    DimensionLocked { dimension: usize },
    Rejected,
}

#[derive(Clone, Debug)]
pub struct MatchEvt {
    pub candidates: usize,
    pub returned: usize,
}

#[derive(Clone, Debug)]
pub struct SnapshotEvt {
    pub version: u64,
    pub artworks: usize,
    pub descriptors: usize,
}

#[derive(Clone, Debug)]
pub struct PersistEvt {
    pub kind: PersistKind,
}
#[derive(Clone, Debug)]
pub enum PersistKind {
    Loaded { artworks: usize },
    Committed { ms: u32 },
    Failed,
}

/// Macros (simple versions). Can be feature-gated if desired.
#[macro_export]
macro_rules! obs_count {
    ($m:expr, $name:expr, $labels:expr, $v:expr) => {{
        $m.counter($name, $labels).inc($v as u64);
    }};
}
#[macro_export]
macro_rules! obs_gauge {
    ($m:expr, $name:expr, $labels:expr, $v:expr) => {{
        $m.gauge($name, $labels).set($v as i64);
    }};
}
#[macro_export]
macro_rules! obs_hist {
    ($m:expr, $name:expr, $labels:expr, $v:expr) => {{
        $m.histo($name, &[], $labels).observe($v as f64);
    }};
}
