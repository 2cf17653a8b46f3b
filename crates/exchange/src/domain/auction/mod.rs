//! Auction orchestration: from the inbound request through the concurrent
//! bidder fan-out to the ranked response.

use {
    super::{
        Account,
        ConfigurationError,
        Deadline,
        account::{self, NotFound, Settings},
        bidder::{BidderError, BidderOutcome, BidderRequest, Catalog, Name},
        category::{BidKey, CategoryMapper},
        currency::{CurrencyConverter, Rates, WithRequestRates},
        hooks::{
            self,
            ExecutionContext,
            Executor,
            Registry,
            Rejection,
            Stage,
            StageOutcome,
            StageResult,
            payload::{
                AllProcessedBidResponsesPayload,
                AuctionRequestPayload,
                AuctionResponsePayload,
                BidderRequestPayload,
                BidderResponsePayload,
                EntrypointPayload,
                ExitpointPayload,
            },
        },
        openrtb::{BidRequest, BidResponse, InvalidRequest, RequestPrebid},
    },
    crate::infra::observe,
    ::observe::future::Measure,
    rust_decimal::Decimal,
    serde_json::Value,
    std::{
        collections::{BTreeMap, HashMap},
        sync::Arc,
        time::Duration,
    },
    tokio::time::Instant,
    tracing::Instrument,
};

mod bidders;
mod fanout;
mod ranking;
mod response;
mod validation;

pub use {
    bidders::{Participant, Selection, select},
    fanout::{Unfinished, join_until},
    ranking::RankedBid,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Used when the request doesn't set `tmax`.
    pub default_timeout: Duration,
    /// Upper bound for `tmax`.
    pub max_timeout: Duration,
    /// Time kept back from the bidders for the work after they responded.
    pub post_processing_reserve: Duration,
    /// The currency bids are ranked and reported in.
    pub currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(1),
            max_timeout: Duration::from_secs(3),
            post_processing_reserve: Duration::ZERO,
            currency: super::currency::DEFAULT.to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),
    #[error(transparent)]
    UnknownAccount(#[from] NotFound),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("failed to serialize the response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A bidder a hook rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedBidder {
    pub bidder: Name,
    pub rejection: Rejection,
}

#[derive(Debug, Clone)]
pub struct AggregatedAuctionResult {
    /// The request after processing and the request stage hooks.
    pub request: BidRequest,
    pub currency: String,
    /// One outcome per participating bidder, in selection order.
    pub outcomes: Vec<BidderOutcome>,
    pub rejected: Vec<RejectedBidder>,
    /// Set when a hook rejected the whole auction.
    pub rejection: Option<Rejection>,
    /// Bids ordered by price, highest first.
    pub ranked: Vec<RankedBid>,
    pub categories: HashMap<BidKey, String>,
    /// Warnings that don't belong to a single bidder.
    pub warnings: Vec<String>,
    pub elapsed: Duration,
    /// Every stage that ran for this auction, bidder stages included.
    pub hooks: Vec<StageOutcome>,
}

pub struct Exchange {
    config: Config,
    catalog: Catalog,
    settings: Arc<dyn Settings>,
    hooks: Executor,
    currency: Arc<dyn CurrencyConverter>,
    categories: Option<Arc<dyn CategoryMapper>>,
}

impl Exchange {
    pub fn new(
        config: Config,
        catalog: Catalog,
        settings: Arc<dyn Settings>,
        hooks: Executor,
        currency: Arc<dyn CurrencyConverter>,
    ) -> Self {
        Self {
            config,
            catalog,
            settings,
            hooks,
            currency,
            categories: None,
        }
    }

    pub fn with_categories(mut self, categories: Arc<dyn CategoryMapper>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn hooks(&self) -> &Executor {
        &self.hooks
    }

    /// Swaps registry and plans. Auctions in flight are not affected.
    pub fn reload_hooks(
        &self,
        registry: Registry,
        config: hooks::Config,
    ) -> Result<(), ConfigurationError> {
        self.hooks.reload(registry, config)
    }

    /// Handles an auction HTTP request from the raw request to the raw
    /// response.
    pub async fn handle(&self, request: EntrypointPayload) -> Result<ExitpointPayload, Error> {
        let started = Instant::now();
        let mut context = ExecutionContext::default();
        let (request, rejection) = self
            .hooks
            .auction_stage(Stage::Entrypoint, request, None, &mut context)
            .await;
        if let Some(rejection) = rejection {
            observe::auction_rejected(&rejection);
            let id = serde_json::from_str::<Value>(&request.body)
                .ok()
                .and_then(|body| Some(body.get("id")?.as_str()?.to_owned()))
                .unwrap_or_default();
            let response = response::rejected(id, &self.config.currency, &rejection);
            return self.respond(response, None, &mut context).await;
        }

        let bid_request: BidRequest = serde_json::from_str(&request.body)
            .map_err(|err| InvalidRequest(format!("failed to parse request: {err}")))?;
        bid_request.validate()?;
        context.debug = bid_request.debug();
        let account = account::resolve(
            self.settings.as_ref(),
            bid_request.account_id().as_deref(),
        )
        .await?;

        let span = tracing::info_span!("auction", id = %bid_request.id, account = %account.id);
        let result = self
            .auction_since(started, bid_request, &account, &mut context)
            .instrument(span)
            .await?;

        let response = {
            let _overhead = ::observe::metrics::metrics()
                .on_auction_overhead_start("exchange", "build_response");
            response::build(&result)
        };
        let (payload, _) = self
            .hooks
            .auction_stage(
                Stage::AuctionResponse,
                AuctionResponsePayload {
                    bid_response: response,
                },
                Some(&account),
                &mut context,
            )
            .await;
        self.respond(payload.bid_response, Some(&account), &mut context)
            .await
    }

    async fn respond(
        &self,
        mut response: BidResponse,
        account: Option<&Account>,
        context: &mut ExecutionContext,
    ) -> Result<ExitpointPayload, Error> {
        if context.debug {
            response::attach_trace(&mut response, context);
        }
        let exitpoint = ExitpointPayload {
            headers: BTreeMap::from([("content-type".to_owned(), "application/json".to_owned())]),
            body: serde_json::to_string(&response)?,
        };
        let (exitpoint, _) = self
            .hooks
            .auction_stage(Stage::Exitpoint, exitpoint, account, context)
            .await;
        Ok(exitpoint)
    }

    /// Runs the auction for a parsed request with the deadline starting now.
    ///
    /// Bidder failures, hook failures and rejections all end up in the result;
    /// only an invalid configuration aborts the auction.
    pub async fn auction(
        &self,
        request: BidRequest,
        account: &Account,
        context: &mut ExecutionContext,
    ) -> Result<AggregatedAuctionResult, ConfigurationError> {
        self.auction_since(Instant::now(), request, account, context)
            .await
    }

    /// Runs the auction for a request that arrived at `started`. Time spent
    /// before the call counts against the request's timeout.
    pub async fn auction_since(
        &self,
        started: Instant,
        request: BidRequest,
        account: &Account,
        context: &mut ExecutionContext,
    ) -> Result<AggregatedAuctionResult, ConfigurationError> {
        let timeout = self.timeout(&request);
        let deadline = Deadline::starting_at(started, timeout)?;
        observe::auction_started(&request, account, timeout);

        let (payload, rejection) = self
            .hooks
            .auction_stage(
                Stage::RawAuctionRequest,
                AuctionRequestPayload {
                    bid_request: request,
                },
                Some(account),
                context,
            )
            .await;
        if let Some(rejection) = rejection {
            return Ok(self.rejected(payload.bid_request, rejection, started, context));
        }

        let (payload, rejection) = self
            .hooks
            .auction_stage(
                Stage::ProcessedAuctionRequest,
                AuctionRequestPayload {
                    bid_request: self.process(payload.bid_request, timeout),
                },
                Some(account),
                context,
            )
            .await;
        if let Some(rejection) = rejection {
            return Ok(self.rejected(payload.bid_request, rejection, started, context));
        }
        let request = payload.bid_request;
        let prebid = request.prebid().unwrap_or_default();

        let selection = select(&request, &prebid.aliases, &self.catalog, account);
        let bidder_deadline = deadline.reduce(self.config.post_processing_reserve);
        let dispatched = Instant::now();
        let invocations = join_until(
            bidder_deadline,
            selection.participants.iter().map(|participant| {
                let bidder = &participant.request.bidder;
                let span = tracing::info_span!("bidder", name = %bidder);
                BidderTask {
                    hooks: self.hooks.clone(),
                    participant: participant.clone(),
                    account: account.clone(),
                    adjustment: prebid
                        .bidadjustmentfactors
                        .get(bidder.as_str())
                        .or_else(|| account.bid_adjustments.get(bidder))
                        .copied()
                        .unwrap_or(Decimal::ONE),
                    module_contexts: context.module_contexts.clone(),
                    debug: context.debug,
                    deadline: bidder_deadline,
                }
                .run()
                .instrument(span)
            }),
        )
        .await;

        let mut outcomes = Vec::with_capacity(invocations.len());
        let mut rejected = Vec::new();
        for (participant, invocation) in selection.participants.iter().zip(invocations) {
            let invocation = match invocation {
                Ok(invocation) => invocation,
                Err(unfinished) => {
                    let bidder = &participant.request.bidder;
                    let error = match unfinished {
                        Unfinished::Deadline => {
                            observe::bidder_timeout(bidder);
                            BidderError::Timeout
                        }
                        Unfinished::Failed => {
                            BidderError::Internal("bidder invocation failed".to_owned())
                        }
                    };
                    outcomes.push(BidderOutcome {
                        response_time: dispatched.elapsed(),
                        ..BidderOutcome::new(bidder.clone(), participant.cookie_family.clone())
                            .failed(error)
                    });
                    continue;
                }
            };
            context.stage_outcomes.extend(invocation.stages);
            if let Some(rejection) = invocation.rejection {
                rejected.push(RejectedBidder {
                    bidder: participant.request.bidder.clone(),
                    rejection,
                });
            }
            outcomes.push(invocation.outcome);
        }

        let (payload, _) = self
            .hooks
            .auction_stage(
                Stage::AllProcessedBidResponses,
                AllProcessedBidResponsesPayload { outcomes },
                Some(account),
                context,
            )
            .await;
        let mut outcomes = payload.outcomes;
        let mut warnings = selection.warnings;

        self.convert(&mut outcomes, &prebid);
        let categories = self
            .categorize(&mut outcomes, &request, account, deadline, &mut warnings)
            .await;
        let ranked = ranking::rank(&outcomes, &self.config.currency);

        let result = AggregatedAuctionResult {
            request,
            currency: self.config.currency.clone(),
            outcomes,
            rejected,
            rejection: None,
            ranked,
            categories,
            warnings,
            elapsed: started.elapsed(),
            hooks: context.stage_outcomes.clone(),
        };
        observe::auction_finished(&result);
        Ok(result)
    }

    fn timeout(&self, request: &BidRequest) -> Duration {
        request
            .tmax
            .filter(|tmax| *tmax > 0)
            .map(Duration::from_millis)
            .unwrap_or(self.config.default_timeout)
            .min(self.config.max_timeout)
    }

    /// Fills in what the rest of the auction relies on.
    fn process(&self, mut request: BidRequest, timeout: Duration) -> BidRequest {
        request.tmax = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        if request.cur.is_empty() {
            request.cur = vec![self.config.currency.clone()];
        }
        request
    }

    fn rejected(
        &self,
        request: BidRequest,
        rejection: Rejection,
        started: Instant,
        context: &ExecutionContext,
    ) -> AggregatedAuctionResult {
        observe::auction_rejected(&rejection);
        AggregatedAuctionResult {
            request,
            currency: self.config.currency.clone(),
            outcomes: Default::default(),
            rejected: Default::default(),
            rejection: Some(rejection),
            ranked: Default::default(),
            categories: Default::default(),
            warnings: Default::default(),
            elapsed: started.elapsed(),
            hooks: context.stage_outcomes.clone(),
        }
    }

    /// Converts all bid prices into the auction currency. Bids that can't be
    /// converted keep their currency and can't win.
    fn convert(&self, outcomes: &mut [BidderOutcome], prebid: &RequestPrebid) {
        let converter = WithRequestRates {
            server: self.currency.as_ref(),
            request: prebid
                .currency
                .as_ref()
                .map(|currency| Rates::new(currency.rates.clone()))
                .unwrap_or_default(),
            server_first: prebid
                .currency
                .as_ref()
                .is_none_or(|currency| currency.usepbsrates),
        };
        for outcome in outcomes {
            for bid in &mut outcome.bids {
                match converter.convert(bid.bid.price, &bid.currency, &self.config.currency) {
                    Ok(price) => {
                        bid.bid.price = price;
                        bid.currency = self.config.currency.clone();
                    }
                    Err(err) => {
                        observe::currency_conversion_failed(&outcome.bidder, &err);
                        outcome.warnings.push(err.to_string());
                    }
                }
            }
        }
    }

    async fn categorize(
        &self,
        outcomes: &mut [BidderOutcome],
        request: &BidRequest,
        account: &Account,
        deadline: Deadline,
        warnings: &mut Vec<String>,
    ) -> HashMap<BidKey, String> {
        let Some(mapper) = &self.categories else {
            return Default::default();
        };
        let mapping = tokio::time::timeout_at(
            deadline.instant(),
            mapper
                .dedupe(outcomes, request, account, deadline)
                .measure("category_mapping"),
        )
        .await;
        let mapping = match mapping {
            Ok(Ok(mapping)) => mapping,
            Ok(Err(err)) => {
                observe::category_mapping_failed(&err.to_string());
                warnings.push(err.to_string());
                return Default::default();
            }
            Err(_) => {
                let warning = "category mapping timed out".to_owned();
                observe::category_mapping_failed(&warning);
                warnings.push(warning);
                return Default::default();
            }
        };

        for ((bidder, bid), reason) in mapping.dropped {
            if let Some(outcome) = outcomes.iter_mut().find(|outcome| outcome.bidder == bidder) {
                outcome.bids.retain(|candidate| candidate.bid.id != bid);
                outcome.warnings.push(format!("bid \"{bid}\" dropped: {reason}"));
            }
        }
        mapping.categories
    }
}

/// Everything that happens for a single bidder. Runs as its own task next to
/// the other bidders and is aborted when the deadline passes.
struct BidderTask {
    hooks: Executor,
    participant: Participant,
    account: Account,
    adjustment: Decimal,
    module_contexts: HashMap<String, Value>,
    debug: bool,
    deadline: Deadline,
}

impl BidderTask {
    async fn run(mut self) -> BidderInvocation {
        let participant = &self.participant;
        let account = &self.account;
        let bidder = &participant.request.bidder;
        let mut invocation = BidderInvocation {
            outcome: BidderOutcome::new(bidder.clone(), participant.cookie_family.clone()),
            stages: Default::default(),
            rejection: None,
        };

        let StageResult {
            payload,
            rejection,
            outcome,
        } = self
            .hooks
            .bidder_stage(
                Stage::BidderRequest,
                BidderRequestPayload {
                    bid_request: participant.request.request.clone(),
                },
                account,
                bidder,
                &mut self.module_contexts,
                self.debug,
            )
            .await;
        if invocation.record(outcome, rejection) {
            return invocation;
        }
        let request = BidderRequest {
            bidder: bidder.clone(),
            request: payload.bid_request,
        };

        observe::bidder_request(&request);
        let started = Instant::now();
        let result = participant
            .invoker
            .request_bids(&request, self.deadline)
            .await;
        invocation.outcome.response_time = started.elapsed();
        let seat = match result {
            Ok(seat) => seat,
            Err(err) => {
                invocation.outcome.error = Some(err);
                observe::bidder_outcome(&invocation.outcome);
                return invocation;
            }
        };
        invocation.outcome.warnings.extend(seat.warnings);

        let StageResult {
            payload,
            rejection,
            outcome,
        } = self
            .hooks
            .bidder_stage(
                Stage::RawBidderResponse,
                BidderResponsePayload { bids: seat.bids },
                account,
                bidder,
                &mut self.module_contexts,
                self.debug,
            )
            .await;
        if invocation.record(outcome, rejection) {
            observe::bidder_outcome(&invocation.outcome);
            return invocation;
        }

        let (bids, warnings) = validation::validate(&request.request, payload.bids);
        invocation.outcome.warnings.extend(warnings);
        let (bids, warnings) = validation::adjust(bids, self.adjustment);
        invocation.outcome.warnings.extend(warnings);

        let StageResult {
            payload,
            rejection,
            outcome,
        } = self
            .hooks
            .bidder_stage(
                Stage::ProcessedBidderResponse,
                BidderResponsePayload { bids },
                account,
                bidder,
                &mut self.module_contexts,
                self.debug,
            )
            .await;
        if !invocation.record(outcome, rejection) {
            invocation.outcome.bids = payload.bids;
        }
        observe::bidder_outcome(&invocation.outcome);
        invocation
    }
}

/// What a single bidder invocation produced.
struct BidderInvocation {
    outcome: BidderOutcome,
    stages: Vec<StageOutcome>,
    rejection: Option<Rejection>,
}

impl BidderInvocation {
    /// Records a stage. Returns whether a hook rejected the bidder, in which
    /// case its bids are discarded.
    fn record(&mut self, outcome: StageOutcome, rejection: Option<Rejection>) -> bool {
        self.stages.push(outcome);
        let Some(rejection) = rejection else {
            return false;
        };
        self.outcome.bids.clear();
        self.outcome.error = Some(BidderError::RejectedByHook {
            stage: rejection.stage,
            hook: rejection.hook_id.clone(),
        });
        self.rejection = Some(rejection);
        true
    }
}
