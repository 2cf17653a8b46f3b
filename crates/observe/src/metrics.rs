use {
    prometheus::{
        Encoder,
        core::{AtomicF64, AtomicU64, GenericCounterVec},
    },
    std::{
        collections::HashMap,
        sync::OnceLock,
        time::Instant,
    },
};

/// Global metrics registry used by all components.
static REGISTRY: OnceLock<prometheus_metric_storage::StorageRegistry> = OnceLock::new();

/// Configures the global metrics registry with a common prefix and common
/// labels for all metric names.
///
/// Should be called before any call to [`get_registry`]. Later calls are
/// ignored, so tests can call it repeatedly.
pub fn setup_registry_reentrant(prefix: Option<String>, labels: Option<HashMap<String, String>>) {
    let registry = prometheus::Registry::new_custom(prefix, labels).unwrap();
    let storage_registry = prometheus_metric_storage::StorageRegistry::new(registry);
    REGISTRY.set(storage_registry).ok();
}

/// Get the global instance of the metrics registry.
pub fn get_registry() -> &'static prometheus::Registry {
    get_storage_registry().registry()
}

/// Get the global instance of the metric storage registry.
///
/// Falls back to a default registry if [`setup_registry_reentrant`] was never
/// called so unit tests don't have to configure it first.
pub fn get_storage_registry() -> &'static prometheus_metric_storage::StorageRegistry {
    REGISTRY.get_or_init(prometheus_metric_storage::StorageRegistry::default)
}

/// Renders all metrics of the registry in the prometheus text format.
pub fn encode(registry: &prometheus::Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(?err, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// `/metrics` route exposing encoded prometheus data to the monitoring system.
pub fn handle_metrics() -> axum::Router {
    async fn metrics_handler() -> String {
        encode(get_registry())
    }

    axum::Router::new().route("/metrics", axum::routing::get(metrics_handler))
}

/// Metrics shared by potentially all processes.
#[derive(prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Time spent on work that is not waiting for bidders, per phase.
    #[metric(labels("component", "phase"))]
    pub auction_overhead_time: GenericCounterVec<AtomicF64>,

    /// How many measurements we did for each source of overhead.
    #[metric(labels("component", "phase"))]
    pub auction_overhead_count: GenericCounterVec<AtomicU64>,
}

impl Metrics {
    /// Returns a guard that measures the overhead when it gets dropped.
    #[must_use]
    pub fn on_auction_overhead_start<'a, 'b, 'c>(
        &'a self,
        component: &'b str,
        phase: &'c str,
    ) -> impl Drop + use<'a, 'b, 'c> {
        let start = Instant::now();
        scopeguard::guard(start, move |start| {
            self.measure_auction_overhead(start, component, phase);
        })
    }

    pub fn measure_auction_overhead(&self, start: Instant, component: &str, phase: &str) {
        self.auction_overhead_time
            .with_label_values(&[component, phase])
            .inc_by(start.elapsed().as_secs_f64());

        self.auction_overhead_count
            .with_label_values(&[component, phase])
            .inc()
    }
}

pub fn metrics() -> &'static Metrics {
    Metrics::instance(get_storage_registry()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overhead_guard_records_on_drop() {
        let metrics = metrics();
        let before = metrics
            .auction_overhead_count
            .with_label_values(&["test", "guard"])
            .get();
        {
            let _guard = metrics.on_auction_overhead_start("test", "guard");
        }
        let after = metrics
            .auction_overhead_count
            .with_label_values(&["test", "guard"])
            .get();
        assert_eq!(after, before + 1);
        assert!(encode(get_registry()).contains("auction_overhead_count"));
    }
}
