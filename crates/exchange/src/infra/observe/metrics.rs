/// Metrics for the exchange.
#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// The results of calling bidders.
    #[metric(labels("bidder", "result"))]
    pub bidder_requests: prometheus::IntCounterVec,
    /// Time it took bidders to respond, including time outs.
    #[metric(
        labels("bidder"),
        buckets(0.01, 0.025, 0.05, 0.1, 0.2, 0.3, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0)
    )]
    pub bidder_request_time: prometheus::HistogramVec,
    /// Number of bids received per bidder.
    #[metric(labels("bidder"))]
    pub bids: prometheus::IntCounterVec,
    /// How many times each hook ran and how that went.
    #[metric(labels("module", "stage", "status"))]
    pub hook_executions: prometheus::IntCounterVec,
    /// Time spent executing hooks per stage.
    #[metric(
        labels("stage"),
        buckets(0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0)
    )]
    pub hook_execution_time: prometheus::HistogramVec,
    /// The results of auctions.
    #[metric(labels("result"))]
    pub auctions: prometheus::IntCounterVec,
    /// Total time of an auction from dispatching bidders to the ranked result.
    #[metric(buckets(0.05, 0.1, 0.2, 0.3, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0))]
    pub auction_time: prometheus::Histogram,
    /// Requests to the auction endpoint by response status.
    #[metric(labels("status"))]
    pub api_requests: prometheus::IntCounterVec,
}

/// Setup the metrics registry.
pub fn init() {
    observe::metrics::setup_registry_reentrant(Some("exchange".to_owned()), None);
}

/// Get the metrics instance.
pub fn get() -> &'static Metrics {
    Metrics::instance(observe::metrics::get_storage_registry())
        .expect("unexpected error getting metrics instance")
}
