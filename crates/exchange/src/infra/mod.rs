pub mod api;
pub mod bidder;
pub mod cli;
pub mod config;
pub mod observe;
pub mod settings;

pub use {api::Api, config::Config};
