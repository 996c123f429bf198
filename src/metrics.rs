//! Prometheus metrics for the edge service, built on [prometheus_client] (`spec.md` §A.4: ambient,
//! carried regardless of any feature Non-goals since it is an operational concern, not a feature).

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

pub(crate) type HistogramFamily<T> = Family<T, Histogram, fn() -> Histogram>;

/// The application metrics registry.
static REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(build_registry);

/// A counter for the number of external requests, labeled by handler and outcome.
static REQUEST: LazyLock<Family<RequestLabels, Counter>> =
    LazyLock::new(Family::<RequestLabels, Counter>::default);

/// A histogram for the mojang request latencies in seconds, labeled by request type and status.
static MOJANG_REQ_LAT: LazyLock<HistogramFamily<MojangLabels>> = LazyLock::new(|| {
    HistogramFamily::<MojangLabels>::new_with_constructor(|| {
        Histogram::new([0.05, 0.1, 0.175, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0])
    })
});

/// A counter for the mojang request status, labeled by request type and status.
static MOJANG_REQ: LazyLock<Family<MojangLabels, Counter>> =
    LazyLock::new(Family::<MojangLabels, Counter>::default);

/// A histogram for the cache get latencies in seconds, labeled by cache key kind and hit/miss.
static CACHE_GET: LazyLock<HistogramFamily<CacheGetLabels>> = LazyLock::new(|| {
    HistogramFamily::<CacheGetLabels>::new_with_constructor(|| {
        Histogram::new([0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.175, 0.25, 0.5, 1.0])
    })
});

/// A histogram for the cache set latencies in seconds, labeled by cache key kind.
static CACHE_SET: LazyLock<HistogramFamily<CacheKindLabels>> = LazyLock::new(|| {
    HistogramFamily::<CacheKindLabels>::new_with_constructor(|| {
        Histogram::new([0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.175, 0.25, 0.5, 1.0])
    })
});

/// The scanner's current self-throttle sleep, in milliseconds (`spec.md` §4.5).
static SCANNER_SLEEP_MILLIS: LazyLock<Gauge> = LazyLock::new(Gauge::default);

/// The number of jobs currently queued, labeled by priority.
static SCANNER_QUEUE_DEPTH: LazyLock<Family<QueueLabels, Gauge>> =
    LazyLock::new(Family::<QueueLabels, Gauge>::default);

/// The number of scan jobs currently in flight.
static SCANNER_INFLIGHT: LazyLock<Gauge> = LazyLock::new(Gauge::default);

/// The total number of scanner upserts, labeled by whether the document actually changed.
static SCANNER_UPSERTS: LazyLock<Family<UpsertLabels, Counter>> =
    LazyLock::new(Family::<UpsertLabels, Counter>::default);

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub handler: &'static str,
    pub outcome: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MojangLabels {
    pub request_type: &'static str,
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CacheGetLabels {
    pub key_kind: &'static str,
    pub hit: bool,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CacheKindLabels {
    pub key_kind: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct QueueLabels {
    pub priority: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct UpsertLabels {
    pub changed: bool,
}

fn build_registry() -> Arc<Registry> {
    let mut registry = Registry::with_prefix("edge");

    registry.register(
        "requests",
        "The total number of external requests handled.",
        REQUEST.clone(),
    );
    registry.register(
        "mojang_request_duration_seconds",
        "The upstream request latencies in seconds.",
        MOJANG_REQ_LAT.clone(),
    );
    registry.register(
        "mojang_request_status",
        "The upstream request outcomes.",
        MOJANG_REQ.clone(),
    );
    registry.register(
        "cache_get_duration_seconds",
        "The cache get request latencies in seconds.",
        CACHE_GET.clone(),
    );
    registry.register(
        "cache_set_duration_seconds",
        "The cache set request latencies in seconds.",
        CACHE_SET.clone(),
    );
    registry.register(
        "scanner_sleep_millis",
        "The scanner's current self-throttle delay in milliseconds.",
        SCANNER_SLEEP_MILLIS.clone(),
    );
    registry.register(
        "scanner_queue_depth",
        "The number of scan jobs currently queued.",
        SCANNER_QUEUE_DEPTH.clone(),
    );
    registry.register(
        "scanner_inflight",
        "The number of scan jobs currently in flight.",
        SCANNER_INFLIGHT.clone(),
    );
    registry.register(
        "scanner_upserts",
        "The total number of scanner search-index upserts.",
        SCANNER_UPSERTS.clone(),
    );

    Arc::new(registry)
}

/// Encodes the current state of the registry in the Prometheus text exposition format, used by
/// the `/metrics` handler.
pub fn encode_metrics() -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    encode(&mut buffer, &REGISTRY)?;
    Ok(buffer)
}

pub fn observe_request(handler: &'static str, outcome: &'static str) {
    REQUEST
        .get_or_create(&RequestLabels { handler, outcome })
        .inc();
}

pub fn observe_mojang_request(request_type: &'static str, status: &str, elapsed: Duration) {
    let labels = MojangLabels {
        request_type,
        status: status.to_string(),
    };
    MOJANG_REQ_LAT.get_or_create(&labels).observe(elapsed.as_secs_f64());
    MOJANG_REQ.get_or_create(&labels).inc();
}

pub fn observe_cache_get(key_kind: &'static str, hit: bool, elapsed: Duration) {
    CACHE_GET
        .get_or_create(&CacheGetLabels { key_kind, hit })
        .observe(elapsed.as_secs_f64());
}

pub fn observe_cache_set(key_kind: &'static str, elapsed: Duration) {
    CACHE_SET
        .get_or_create(&CacheKindLabels { key_kind })
        .observe(elapsed.as_secs_f64());
}

pub fn set_scanner_sleep_millis(millis: u64) {
    SCANNER_SLEEP_MILLIS.set(millis as i64);
}

pub fn set_queue_depth(priority: &'static str, depth: i64) {
    SCANNER_QUEUE_DEPTH
        .get_or_create(&QueueLabels { priority })
        .set(depth);
}

pub fn set_inflight(count: i64) {
    SCANNER_INFLIGHT.set(count);
}

pub fn observe_upsert(changed: bool) {
    SCANNER_UPSERTS.get_or_create(&UpsertLabels { changed }).inc();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encodes_without_error() {
        observe_request("profile", "hit");
        let encoded = encode_metrics().unwrap();
        assert!(encoded.contains("edge_requests"));
    }
}
