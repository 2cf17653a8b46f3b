use {
    super::{
        hooks::{HookId, Stage},
        openrtb,
        time::Deadline,
    },
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, sync::Arc, time::Duration},
    thiserror::Error,
};

/// The bidder name. Configured bidders are identified by it, and request
/// aliases resolve to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(pub String);

impl Name {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Name {
    fn from(inner: String) -> Self {
        Self(inner)
    }
}

impl From<&str> for Name {
    fn from(inner: &str) -> Self {
        Self(inner.to_owned())
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request sent to a single bidder. It only contains the impressions the
/// bidder was asked to bid on.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderRequest {
    pub bidder: Name,
    pub request: openrtb::BidRequest,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BidType {
    Banner,
    Video,
    Audio,
    Native,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BidderBid {
    pub bid: openrtb::Bid,
    pub kind: BidType,
    pub currency: String,
}

/// What a bidder returned for one auction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatBid {
    pub bids: Vec<BidderBid>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidderError {
    #[error("timeout")]
    Timeout,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("rejected by hook {hook} during stage {stage}")]
    RejectedByHook { stage: Stage, hook: HookId },
    #[error("internal error: {0}")]
    Internal(String),
}

impl BidderError {
    /// Error code reported in the response `ext.errors`.
    pub fn code(&self) -> u32 {
        match self {
            Self::Timeout => 1,
            Self::InvalidResponse(_) => 3,
            Self::Connection(_) => 4,
            Self::RejectedByHook { .. } => 5,
            Self::Internal(_) => 999,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection(_) => "connection_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::RejectedByHook { .. } => "rejected",
            Self::Internal(_) => "internal",
        }
    }
}

/// One bidder's contribution to an auction. Bids and an error may coexist
/// when a bidder returned partial results.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderOutcome {
    pub bidder: Name,
    pub cookie_family: String,
    pub bids: Vec<BidderBid>,
    pub warnings: Vec<String>,
    pub error: Option<BidderError>,
    pub response_time: Duration,
}

impl BidderOutcome {
    pub fn new(bidder: Name, cookie_family: String) -> Self {
        Self {
            bidder,
            cookie_family,
            bids: Default::default(),
            warnings: Default::default(),
            error: None,
            response_time: Duration::ZERO,
        }
    }

    pub fn failed(mut self, error: BidderError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Performs the outbound call for one bidder. Implementations must stop
/// working on the call once the deadline passes instead of checking it after
/// the fact.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Invoker: Send + Sync {
    async fn request_bids(
        &self,
        request: &BidderRequest,
        deadline: Deadline,
    ) -> Result<SeatBid, BidderError>;
}

/// A configured bidder.
#[derive(Clone)]
pub struct Entry {
    pub invoker: Arc<dyn Invoker>,
    pub cookie_family: String,
    pub enabled: bool,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("cookie_family", &self.cookie_family)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// All bidders the exchange can talk to, built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    bidders: HashMap<Name, Entry>,
}

impl Catalog {
    pub fn with(mut self, name: Name, entry: Entry) -> Self {
        self.bidders.insert(name, entry);
        self
    }

    pub fn entry(&self, name: &Name) -> Option<&Entry> {
        self.bidders.get(name)
    }

    pub fn invoker(&self, name: &Name) -> Option<Arc<dyn Invoker>> {
        self.entry(name).map(|entry| entry.invoker.clone())
    }

    pub fn len(&self) -> usize {
        self.bidders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }
}
