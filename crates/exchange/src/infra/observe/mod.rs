//! This module implements the observability for the exchange. It exposes
//! functions which represent events that are meaningful to the system. These
//! functions are called when the corresponding events occur. They log the event
//! and update the metrics, if the event is worth measuring.

use {
    crate::{
        domain::{
            Account,
            AggregatedAuctionResult,
            bidder::{self, BidderOutcome, BidderRequest},
            currency,
            hooks::{HookId, HookOutcome, Rejection, Stage},
            openrtb::BidRequest,
        },
        infra::cli,
    },
    std::{net::SocketAddr, time::Duration},
    url::Url,
};

pub mod metrics;

/// Setup the observability. The log arguments configure the tokio tracing
/// framework.
pub fn init(args: &cli::Args) {
    ::observe::tracing::initialize(&::observe::Config::new(
        &args.log,
        args.stderr_threshold,
        args.use_json_logs,
    ));
    metrics::init();
}

/// Observe that the API is listening.
pub fn serving(addr: SocketAddr) {
    tracing::info!(port = addr.port(), "serving exchange");
}

/// Observe that the loaded configuration refers to a hook no module
/// provides.
pub fn hook_missing(stage: Stage, id: &HookId) {
    tracing::warn!(%stage, hook = %id, "hook is not registered");
}

/// Observe that new hook configuration was installed.
pub fn hooks_reloaded(modules: usize) {
    tracing::info!(modules, "installed hook configuration");
}

/// Observe the execution of a single hook.
pub fn hook_invoked(stage: Stage, bidder: Option<&bidder::Name>, outcome: &HookOutcome) {
    let bidder = bidder.map(bidder::Name::as_str);
    match outcome.status {
        crate::domain::hooks::Status::Success => tracing::debug!(
            %stage,
            ?bidder,
            hook = %outcome.hook_id,
            action = ?outcome.action,
            time = ?outcome.execution_time,
            "hook executed"
        ),
        status => tracing::warn!(
            %stage,
            ?bidder,
            hook = %outcome.hook_id,
            %status,
            message = ?outcome.message,
            "hook failed"
        ),
    }
    metrics::get()
        .hook_executions
        .with_label_values(&[
            outcome.hook_id.module_code.as_str(),
            stage.into(),
            outcome.status.into(),
        ])
        .inc();
    metrics::get()
        .hook_execution_time
        .with_label_values(&[<&str>::from(stage)])
        .observe(outcome.execution_time.as_secs_f64());
}

/// Observe a received auction request.
pub fn auction_started(request: &BidRequest, account: &Account, timeout: Duration) {
    tracing::info!(
        id = %request.id,
        account = %account.id,
        imps = request.imp.len(),
        ?timeout,
        "auction started"
    );
}

/// Observe that a hook ended the auction early.
pub fn auction_rejected(rejection: &Rejection) {
    tracing::info!(
        stage = %rejection.stage,
        hook = %rejection.hook_id,
        reason = ?rejection.reason,
        "auction rejected by hook"
    );
    metrics::get()
        .auctions
        .with_label_values(&["rejected"])
        .inc();
}

/// Observe the result of an auction.
pub fn auction_finished(result: &AggregatedAuctionResult) {
    let winners = result.ranked.iter().filter(|bid| bid.winner).count();
    tracing::info!(
        id = %result.request.id,
        bidders = result.outcomes.len(),
        bids = result.ranked.len(),
        winners,
        warnings = ?result.warnings,
        elapsed = ?result.elapsed,
        "auction finished"
    );
    let label = if winners == 0 { "no_bids" } else { "success" };
    metrics::get().auctions.with_label_values(&[label]).inc();
    metrics::get()
        .auction_time
        .observe(result.elapsed.as_secs_f64());
}

/// Observe a request about to be sent to a bidder.
pub fn bidder_request(request: &BidderRequest) {
    tracing::trace!(bidder = %request.bidder, request = ?request.request, "bidder request");
}

/// Observe an outbound call to a bidder.
pub fn bidder_call(bidder: &bidder::Name, method: &reqwest::Method, url: &Url) {
    tracing::trace!(%bidder, %method, %url, "sending bidder call");
}

/// Observe what a bidder contributed to the auction.
pub fn bidder_outcome(outcome: &BidderOutcome) {
    let result = match &outcome.error {
        Some(err) => {
            tracing::warn!(
                bidder = %outcome.bidder,
                ?err,
                time = ?outcome.response_time,
                "bidder failed"
            );
            err.label()
        }
        None => {
            tracing::debug!(
                bidder = %outcome.bidder,
                bids = outcome.bids.len(),
                warnings = ?outcome.warnings,
                time = ?outcome.response_time,
                "bidder responded"
            );
            if outcome.bids.is_empty() { "no_bids" } else { "success" }
        }
    };
    metrics::get()
        .bidder_requests
        .with_label_values(&[outcome.bidder.as_str(), result])
        .inc();
    metrics::get()
        .bidder_request_time
        .with_label_values(&[outcome.bidder.as_str()])
        .observe(outcome.response_time.as_secs_f64());
    metrics::get()
        .bids
        .with_label_values(&[outcome.bidder.as_str()])
        .inc_by(outcome.bids.len() as u64);
}

/// Observe that a bidder did not respond before the deadline.
pub fn bidder_timeout(bidder: &bidder::Name) {
    tracing::warn!(%bidder, "bidder timed out");
    metrics::get()
        .bidder_requests
        .with_label_values(&[bidder.as_str(), "timeout"])
        .inc();
}

/// Observe that a bid's price could not be converted to the auction
/// currency.
pub fn currency_conversion_failed(bidder: &bidder::Name, err: &currency::Error) {
    tracing::debug!(%bidder, ?err, "failed to convert bid price");
}

/// Observe that category mapping failed or was abandoned.
pub fn category_mapping_failed(reason: &str) {
    tracing::warn!(reason, "category mapping failed");
}

/// Observe the response status of a handled auction request.
pub fn api_response(status: axum::http::StatusCode) {
    metrics::get()
        .api_requests
        .with_label_values(&[status.as_str()])
        .inc();
}

/// Observe that an auction request could not be handled.
pub fn request_failed(err: &crate::domain::auction::Error) {
    tracing::warn!(?err, "failed to handle auction request");
}
