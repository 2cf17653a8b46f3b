use {
    crate::{
        domain::{auction, category, currency::Rates, hooks},
        infra::{bidder, settings},
    },
};

pub mod file;

/// Configuration of infrastructural components.
#[derive(Debug)]
pub struct Config {
    pub auction: auction::Config,
    pub bidders: Vec<bidder::Config>,
    pub settings: settings::Config,
    pub hooks: hooks::Config,
    pub currency: Rates,
    pub category: Option<category::Static>,
}
