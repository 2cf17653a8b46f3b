pub use load::load;
use {
    crate::{domain::hooks::ExecutionPlan, infra::bidder::AdapterKind},
    rust_decimal::Decimal,
    serde::Deserialize,
    serde_json::Value,
    std::{
        collections::{BTreeMap, HashMap},
        time::Duration,
    },
    url::Url,
};

mod load;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// Auction timing and currency.
    #[serde(default)]
    auction: AuctionConfig,

    #[serde(default)]
    settings: SettingsConfig,

    #[serde(default, rename = "bidder")]
    bidders: Vec<BidderConfig>,

    #[serde(default, rename = "account")]
    accounts: Vec<AccountConfig>,

    #[serde(default)]
    hooks: HooksConfig,

    #[serde(default)]
    currency: CurrencyConfig,

    /// Category mapping is disabled unless configured.
    category: Option<CategoryConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AuctionConfig {
    /// Timeout used when the request doesn't set `tmax`.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    default_timeout: Duration,

    /// Requests asking for more time than this are clamped.
    #[serde(with = "humantime_serde", default = "default_max_timeout")]
    max_timeout: Duration,

    /// How much of the auction timeout is kept back from the bidders for
    /// currency conversion, category mapping and building the response.
    #[serde(with = "humantime_serde", default)]
    post_processing_reserve: Duration,

    /// The currency bids are ranked and reported in.
    #[serde(default = "default_currency")]
    currency: String,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            max_timeout: default_max_timeout(),
            post_processing_reserve: Duration::ZERO,
            currency: default_currency(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_max_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_currency() -> String {
    crate::domain::currency::DEFAULT.to_owned()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SettingsConfig {
    /// Refuse requests that don't name a configured account.
    #[serde(default)]
    require_account: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BidderConfig {
    /// The name requests use to address the bidder.
    name: String,

    /// Where the bidder receives bid requests.
    endpoint: Url,

    /// How requests and responses are translated for this bidder.
    #[serde(default)]
    adapter: AdapterKind,

    /// Cookie sync family. Defaults to the bidder name.
    cookie_family: Option<String>,

    #[serde(default = "default_enabled")]
    enabled: bool,

    /// Larger responses are treated as invalid.
    #[serde(default = "default_response_size_limit")]
    response_size_limit: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_response_size_limit() -> usize {
    1_000_000
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AccountConfig {
    id: String,

    /// Bidders that never take part in this account's auctions.
    #[serde(default)]
    disabled_bidders: Vec<String>,

    /// Bid price multipliers per bidder.
    #[serde(default)]
    bid_adjustments: HashMap<String, Decimal>,

    #[serde(default)]
    hooks: AccountHooksConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AccountHooksConfig {
    /// Replaces `hooks.default-account-execution-plan` for this account.
    execution_plan: Option<ExecutionPlan>,

    /// Configuration handed to the hooks of each module.
    #[serde(default)]
    modules: HashMap<String, Value>,

    #[serde(default)]
    module_execution: HashMap<String, bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct HooksConfig {
    /// Runs for every request before the account plan.
    #[serde(default)]
    host_execution_plan: ExecutionPlan,

    /// Used for accounts without their own plan.
    #[serde(default)]
    default_account_execution_plan: ExecutionPlan,

    /// Enables or disables modules for all accounts.
    #[serde(default)]
    module_execution: HashMap<String, bool>,

    /// Only run modules an account configures or enables.
    #[serde(default)]
    require_config_to_invoke: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct CurrencyConfig {
    /// Conversion rates as `rates.<from>.<to> = rate`.
    #[serde(default)]
    rates: BTreeMap<String, BTreeMap<String, Decimal>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct CategoryConfig {
    /// Bid categories to the categories reported in the response.
    #[serde(default)]
    mapping: HashMap<String, String>,

    /// Drop bids that compete with an equal bid on the same impression.
    #[serde(default)]
    dedupe: bool,

    /// Drop bids whose category can't be mapped.
    #[serde(default)]
    with_category: bool,
}
