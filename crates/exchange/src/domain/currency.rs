//! Converting bid prices into the currency of the auction.

use {
    rust_decimal::{Decimal, RoundingStrategy},
    std::collections::BTreeMap,
    thiserror::Error,
};

/// Assumed when a bid or request doesn't name a currency.
pub const DEFAULT: &str = "USD";

/// Converted amounts are rounded to this many decimal places.
const PRECISION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unable to convert from currency {from} to desired ad server currency {to}")]
pub struct Error {
    pub from: String,
    pub to: String,
}

pub trait CurrencyConverter: Send + Sync {
    /// The factor to multiply an amount in `from` by to get `to`.
    fn rate(&self, from: &str, to: &str) -> Option<Decimal>;

    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, Error> {
        let from = if from.is_empty() { DEFAULT } else { from };
        let to = if to.is_empty() { DEFAULT } else { to };
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }
        let error = || Error {
            from: from.to_owned(),
            to: to.to_owned(),
        };
        let converted = self
            .rate(from, to)
            .and_then(|rate| amount.checked_mul(rate))
            .ok_or_else(error)?;
        Ok(converted.round_dp_with_strategy(PRECISION, RoundingStrategy::MidpointNearestEven))
    }
}

/// A static rate table: `table[from][to]` is the rate from `from` to `to`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rates {
    table: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl Rates {
    pub fn new(table: BTreeMap<String, BTreeMap<String, Decimal>>) -> Self {
        let table = table
            .into_iter()
            .map(|(from, rates)| {
                let rates = rates
                    .into_iter()
                    .map(|(to, rate)| (to.to_uppercase(), rate))
                    .collect();
                (from.to_uppercase(), rates)
            })
            .collect();
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn get(&self, from: &str, to: &str) -> Option<Decimal> {
        self.table
            .get(from)?
            .get(to)
            .copied()
            .filter(|rate| !rate.is_zero())
    }
}

impl CurrencyConverter for Rates {
    /// Tries the direct rate, then the inverse of the reverse rate, then a
    /// currency both sides have a rate for.
    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let (from, to) = (from.to_uppercase(), to.to_uppercase());
        if let Some(rate) = self.get(&from, &to) {
            return Some(rate);
        }
        if let Some(rate) = self.get(&to, &from) {
            return Decimal::ONE.checked_div(rate);
        }
        let (from_rates, to_rates) = (self.table.get(&from)?, self.table.get(&to)?);
        from_rates.iter().find_map(|(shared, from_rate)| {
            let to_rate = to_rates.get(shared).filter(|rate| !rate.is_zero())?;
            from_rate.checked_div(*to_rate)
        })
    }
}

/// Combines the exchange's rates with the ones a request brings along. The
/// `server_first` flag decides which table is consulted first.
pub struct WithRequestRates<'a> {
    pub server: &'a dyn CurrencyConverter,
    pub request: Rates,
    pub server_first: bool,
}

impl CurrencyConverter for WithRequestRates<'_> {
    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let request = || self.request.rate(from, to);
        let server = || self.server.rate(from, to);
        if self.server_first {
            server().or_else(request)
        } else {
            request().or_else(server)
        }
    }
}
