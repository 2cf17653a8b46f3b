//! Accounts from the configuration file.

use {
    crate::domain::account::{Account, NotFound, Settings},
    std::collections::HashMap,
};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub require_account: bool,
    pub accounts: Vec<Account>,
}

/// Account settings that never change while the exchange runs.
#[derive(Debug, Clone)]
pub struct Static {
    accounts: HashMap<String, Account>,
    require_account: bool,
}

impl Static {
    pub fn new(config: Config) -> Self {
        Self {
            accounts: config
                .accounts
                .into_iter()
                .map(|account| (account.id.clone(), account))
                .collect(),
            require_account: config.require_account,
        }
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}

#[async_trait::async_trait]
impl Settings for Static {
    async fn account(&self, id: &str) -> Result<Account, NotFound> {
        self.accounts
            .get(id)
            .cloned()
            .ok_or_else(|| NotFound(id.to_owned()))
    }

    fn default_account(&self) -> Account {
        Account::default()
    }

    fn require_account(&self) -> bool {
        self.require_account
    }
}
