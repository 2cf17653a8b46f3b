//! The auction domain: deadlines, bidders, the hook pipeline and the
//! orchestration that ties them together. Everything in here is independent
//! of how requests reach the exchange and how bidders are called.

pub mod account;
pub mod auction;
pub mod bidder;
pub mod category;
pub mod currency;
pub mod hooks;
pub mod openrtb;
pub mod time;

pub use {
    account::Account,
    auction::{AggregatedAuctionResult, Exchange},
    time::Deadline,
};

/// Invalid deadline, budget or collaborator wiring. This is the only error
/// allowed to abort an auction; everything else becomes an outcome record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("configuration error: {0}")]
pub struct ConfigurationError(pub String);

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
