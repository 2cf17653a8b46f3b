//! The payload each stage hands to its hooks. A payload type is fixed per
//! stage; hooks may only replace its content.

use {
    super::{Hook, Stage},
    crate::domain::{
        bidder::{BidderBid, BidderOutcome},
        openrtb,
    },
    std::{collections::BTreeMap, sync::Arc},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrypointPayload {
    pub query_params: BTreeMap<String, String>,
    /// Header names are lower case.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Used by both the raw and the processed auction request stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionRequestPayload {
    pub bid_request: openrtb::BidRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BidderRequestPayload {
    pub bid_request: openrtb::BidRequest,
}

/// Used by both the raw and the processed bidder response stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderResponsePayload {
    pub bids: Vec<BidderBid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllProcessedBidResponsesPayload {
    pub outcomes: Vec<BidderOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuctionResponsePayload {
    pub bid_response: openrtb::BidResponse,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitpointPayload {
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// A hook together with the stage it was registered for.
#[derive(Clone)]
pub enum StageHook {
    Entrypoint(Arc<dyn Hook<EntrypointPayload>>),
    RawAuctionRequest(Arc<dyn Hook<AuctionRequestPayload>>),
    ProcessedAuctionRequest(Arc<dyn Hook<AuctionRequestPayload>>),
    BidderRequest(Arc<dyn Hook<BidderRequestPayload>>),
    RawBidderResponse(Arc<dyn Hook<BidderResponsePayload>>),
    ProcessedBidderResponse(Arc<dyn Hook<BidderResponsePayload>>),
    AllProcessedBidResponses(Arc<dyn Hook<AllProcessedBidResponsesPayload>>),
    AuctionResponse(Arc<dyn Hook<AuctionResponsePayload>>),
    Exitpoint(Arc<dyn Hook<ExitpointPayload>>),
}

impl StageHook {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Entrypoint(_) => Stage::Entrypoint,
            Self::RawAuctionRequest(_) => Stage::RawAuctionRequest,
            Self::ProcessedAuctionRequest(_) => Stage::ProcessedAuctionRequest,
            Self::BidderRequest(_) => Stage::BidderRequest,
            Self::RawBidderResponse(_) => Stage::RawBidderResponse,
            Self::ProcessedBidderResponse(_) => Stage::ProcessedBidderResponse,
            Self::AllProcessedBidResponses(_) => Stage::AllProcessedBidResponses,
            Self::AuctionResponse(_) => Stage::AuctionResponse,
            Self::Exitpoint(_) => Stage::Exitpoint,
        }
    }
}

impl std::fmt::Debug for StageHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StageHook").field(&self.stage()).finish()
    }
}

/// A stage payload. Ties the payload type to the hooks that accept it.
pub trait Payload: Clone + Send + Sync + 'static {
    fn hook(hook: &StageHook) -> Option<Arc<dyn Hook<Self>>>;
}

macro_rules! payload {
    ($payload:ty => $($variant:ident)|+) => {
        impl Payload for $payload {
            fn hook(hook: &StageHook) -> Option<Arc<dyn Hook<Self>>> {
                match hook {
                    $(StageHook::$variant(hook))|+ => Some(hook.clone()),
                    _ => None,
                }
            }
        }
    };
}

payload!(EntrypointPayload => Entrypoint);
payload!(AuctionRequestPayload => RawAuctionRequest | ProcessedAuctionRequest);
payload!(BidderRequestPayload => BidderRequest);
payload!(BidderResponsePayload => RawBidderResponse | ProcessedBidderResponse);
payload!(AllProcessedBidResponsesPayload => AllProcessedBidResponses);
payload!(AuctionResponsePayload => AuctionResponse);
payload!(ExitpointPayload => Exitpoint);
