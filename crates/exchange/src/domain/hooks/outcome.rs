//! The audit trail of hook execution.

use {
    super::{HookId, Stage},
    crate::domain::bidder,
    serde::{Serialize, Serializer},
    serde_json::Value,
    std::{collections::HashMap, time::Duration},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    Success,
    Failure,
    Timeout,
    /// The hook panicked.
    InvocationFailure,
    /// The hook returned an error or a result the stage doesn't support.
    ExecutionFailure,
}

/// What the executor did with a successful hook result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Effect {
    NoAction,
    Update,
    Reject,
}

/// The scope a stage ran for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    HttpRequest,
    AuctionRequest,
    Bidder(bidder::Name),
    AllProcessedBidResponses,
    AuctionResponse,
    HttpResponse,
}

impl Entity {
    pub fn of(stage: Stage, bidder: Option<&bidder::Name>) -> Self {
        match (stage, bidder) {
            (Stage::Entrypoint, _) => Self::HttpRequest,
            (Stage::RawAuctionRequest | Stage::ProcessedAuctionRequest, _) => Self::AuctionRequest,
            (Stage::AllProcessedBidResponses, _) => Self::AllProcessedBidResponses,
            (Stage::AuctionResponse, _) => Self::AuctionResponse,
            (Stage::Exitpoint, _) => Self::HttpResponse,
            (_, Some(bidder)) => Self::Bidder(bidder.clone()),
            (_, None) => Self::AuctionRequest,
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpRequest => f.write_str("http-request"),
            Self::AuctionRequest => f.write_str("auction-request"),
            Self::Bidder(name) => f.write_str(name.as_str()),
            Self::AllProcessedBidResponses => f.write_str("all-processed-bid-responses"),
            Self::AuctionResponse => f.write_str("auction-response"),
            Self::HttpResponse => f.write_str("http-response"),
        }
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HookOutcome {
    pub hook_id: HookId,
    pub status: Status,
    /// Only set when the hook returned a result that was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Effect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "execution-time-millis", serialize_with = "millis")]
    pub execution_time: Duration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub debug_messages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_tags: Option<Value>,
}

impl HookOutcome {
    pub fn new(hook_id: HookId, status: Status, execution_time: Duration) -> Self {
        Self {
            hook_id,
            status,
            action: None,
            message: None,
            execution_time,
            debug_messages: Default::default(),
            errors: Default::default(),
            warnings: Default::default(),
            analytics_tags: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupOutcome {
    pub invocation_results: Vec<HookOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StageOutcome {
    pub stage: Stage,
    pub entity: Entity,
    pub groups: Vec<GroupOutcome>,
    #[serde(rename = "execution-time-millis", serialize_with = "millis")]
    pub execution_time: Duration,
}

impl StageOutcome {
    /// Hook outcomes in execution order.
    pub fn hooks(&self) -> impl Iterator<Item = &HookOutcome> {
        self.groups.iter().flat_map(|group| &group.invocation_results)
    }
}

/// A hook ended processing of its scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Rejection {
    pub stage: Stage,
    pub hook_id: HookId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The result of running one stage for one scope.
#[derive(Debug, Clone)]
pub struct StageResult<P> {
    /// The payload after the last applied update.
    pub payload: P,
    pub rejection: Option<Rejection>,
    pub outcome: StageOutcome,
}

/// Hook execution state that lives for a whole auction.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// The latest context value of every module, keyed by module code.
    pub module_contexts: HashMap<String, Value>,
    pub stage_outcomes: Vec<StageOutcome>,
    pub debug: bool,
}

impl ExecutionContext {
    /// All hook outcomes of a stage across scopes.
    pub fn outcomes(&self, stage: Stage) -> impl Iterator<Item = &HookOutcome> {
        self.stage_outcomes
            .iter()
            .filter(move |outcome| outcome.stage == stage)
            .flat_map(StageOutcome::hooks)
    }

    /// The execution trace reported in debug responses.
    pub fn trace(&self) -> Value {
        let execution_time = self
            .stage_outcomes
            .iter()
            .fold(Duration::ZERO, |total, outcome| {
                total.saturating_add(outcome.execution_time)
            });
        serde_json::json!({
            "execution-time-millis": u64::try_from(execution_time.as_millis()).unwrap_or(u64::MAX),
            "stages": self.stage_outcomes,
        })
    }
}
