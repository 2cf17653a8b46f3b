use {
    super::{bidder, hooks::ExecutionPlan},
    rust_decimal::Decimal,
    serde_json::Value,
    std::collections::{HashMap, HashSet},
    thiserror::Error,
};

/// Per-publisher settings that decide which bidders and modules take part in
/// an auction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub id: String,
    pub disabled_bidders: HashSet<bidder::Name>,
    /// Bid prices of a bidder are multiplied by its factor.
    pub bid_adjustments: HashMap<bidder::Name, Decimal>,
    pub hooks: Hooks,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooks {
    /// Replaces the default account execution plan when set.
    pub execution_plan: Option<ExecutionPlan>,
    /// Module configuration keyed by module code, handed to every hook of
    /// that module.
    pub modules: HashMap<String, Value>,
    /// Enables or disables modules for this account. The host configuration
    /// takes precedence.
    pub module_execution: HashMap<String, bool>,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("account {0:?} not found")]
pub struct NotFound(pub String);

/// Account lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Settings: Send + Sync {
    async fn account(&self, id: &str) -> Result<Account, NotFound>;

    /// The account used for requests that don't name a known one, when
    /// accounts aren't required.
    fn default_account(&self) -> Account;

    /// Whether requests must name a configured account.
    fn require_account(&self) -> bool;
}

/// Picks the account for a request.
pub async fn resolve(settings: &dyn Settings, id: Option<&str>) -> Result<Account, NotFound> {
    let Some(id) = id else {
        if settings.require_account() {
            return Err(NotFound(String::new()));
        }
        return Ok(settings.default_account());
    };
    match settings.account(id).await {
        Ok(account) => Ok(account),
        Err(err) if settings.require_account() => Err(err),
        Err(_) => Ok(Account {
            id: id.to_owned(),
            ..settings.default_account()
        }),
    }
}
