use serde::{Deserialize, Serialize};

/// A point in the auction lifecycle where hooks run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Entrypoint,
    RawAuctionRequest,
    ProcessedAuctionRequest,
    BidderRequest,
    RawBidderResponse,
    ProcessedBidderResponse,
    AllProcessedBidResponses,
    AuctionResponse,
    Exitpoint,
}

impl Stage {
    /// Whether a hook may end processing of its scope at this stage.
    pub fn reject_allowed(self) -> bool {
        !matches!(
            self,
            Self::AllProcessedBidResponses | Self::AuctionResponse | Self::Exitpoint
        )
    }

    /// Stages that run once per bidder inside that bidder's invocation.
    pub fn is_bidder_scoped(self) -> bool {
        matches!(
            self,
            Self::BidderRequest | Self::RawBidderResponse | Self::ProcessedBidderResponse
        )
    }
}
