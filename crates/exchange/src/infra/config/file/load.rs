use {
    crate::{
        domain::{
            account::{self, Account},
            auction,
            category,
            currency::Rates,
            hooks,
        },
        infra::{self, bidder, config::file, settings},
    },
    anyhow::{Context, bail, ensure},
    itertools::Itertools,
    std::{collections::HashSet, path::Path},
    tokio::fs,
};

/// Load the exchange configuration from a TOML file.
pub async fn load(path: &Path) -> anyhow::Result<infra::Config> {
    let data = fs::read_to_string(path)
        .await
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    parse(&data).with_context(|| format!("invalid configuration in {path:?}"))
}

fn parse(data: &str) -> anyhow::Result<infra::Config> {
    let config: file::Config = toml::de::from_str(data).context("TOML syntax error")?;

    ensure!(
        !config.auction.default_timeout.is_zero(),
        "auction.default-timeout must be positive"
    );
    ensure!(
        config.auction.default_timeout <= config.auction.max_timeout,
        "auction.default-timeout exceeds auction.max-timeout"
    );
    ensure!(
        config.auction.post_processing_reserve < config.auction.max_timeout,
        "auction.post-processing-reserve leaves no time for bidders"
    );

    if let Some(name) = config.bidders.iter().map(|bidder| &bidder.name).duplicates().next() {
        bail!("bidder {name:?} is configured twice");
    }
    if let Some(id) = config.accounts.iter().map(|account| &account.id).duplicates().next() {
        bail!("account {id:?} is configured twice");
    }
    let names = config
        .bidders
        .iter()
        .map(|bidder| bidder.name.as_str())
        .collect::<HashSet<_>>();
    ensure!(!names.contains(""), "bidder name must not be empty");
    for account in &config.accounts {
        for name in &account.disabled_bidders {
            ensure!(
                names.contains(name.as_str()),
                "account {:?} disables unknown bidder {name:?}",
                account.id
            );
        }
    }

    Ok(infra::Config {
        auction: auction::Config {
            default_timeout: config.auction.default_timeout,
            max_timeout: config.auction.max_timeout,
            post_processing_reserve: config.auction.post_processing_reserve,
            currency: config.auction.currency.to_uppercase(),
        },
        bidders: config
            .bidders
            .into_iter()
            .map(|config| bidder::Config {
                cookie_family: config.cookie_family.unwrap_or_else(|| config.name.clone()),
                name: config.name.into(),
                endpoint: config.endpoint,
                adapter: config.adapter,
                enabled: config.enabled,
                response_size_limit: config.response_size_limit,
            })
            .collect(),
        settings: settings::Config {
            require_account: config.settings.require_account,
            accounts: config
                .accounts
                .into_iter()
                .map(|config| Account {
                    id: config.id,
                    disabled_bidders: config
                        .disabled_bidders
                        .into_iter()
                        .map(Into::into)
                        .collect(),
                    bid_adjustments: config
                        .bid_adjustments
                        .into_iter()
                        .map(|(bidder, factor)| (bidder.into(), factor))
                        .collect(),
                    hooks: account::Hooks {
                        execution_plan: config.hooks.execution_plan,
                        modules: config.hooks.modules,
                        module_execution: config.hooks.module_execution,
                    },
                })
                .collect(),
        },
        hooks: hooks::Config {
            host_plan: config.hooks.host_execution_plan,
            default_account_plan: config.hooks.default_account_execution_plan,
            module_execution: config.hooks.module_execution,
            require_config_to_invoke: config.hooks.require_config_to_invoke,
        },
        currency: Rates::new(config.currency.rates),
        category: config.category.map(|config| category::Static {
            mapping: config.mapping,
            dedupe: config.dedupe,
            with_category: config.with_category,
        }),
    })
}
