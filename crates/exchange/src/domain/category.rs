//! Category mapping and competitive deduplication of bids.

use {
    super::{
        Account,
        Deadline,
        bidder::{BidderOutcome, Name},
        openrtb::BidRequest,
    },
    rust_decimal::Decimal,
    std::collections::{HashMap, HashSet},
    thiserror::Error,
};

/// Identifies a bid within an auction.
pub type BidKey = (Name, String);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMapping {
    /// The primary category of every mapped bid.
    pub categories: HashMap<BidKey, String>,
    /// Bids that must not take part in ranking, with the reason.
    pub dropped: Vec<(BidKey, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("category mapping failed: {0}")]
pub struct Error(pub String);

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CategoryMapper: Send + Sync {
    /// Maps bid categories and picks the bids that compete with each other.
    /// Must return by `deadline`; the caller gives up on it afterwards.
    async fn dedupe(
        &self,
        outcomes: &[BidderOutcome],
        request: &BidRequest,
        account: &Account,
        deadline: Deadline,
    ) -> Result<CategoryMapping, Error>;
}

/// Maps categories through a fixed table.
#[derive(Debug, Clone, Default)]
pub struct Static {
    /// Bid category to the category reported in the response.
    pub mapping: HashMap<String, String>,
    /// Drop bids that compete on the same impression, price and category.
    pub dedupe: bool,
    /// Drop bids whose category can't be mapped.
    pub with_category: bool,
}

#[async_trait::async_trait]
impl CategoryMapper for Static {
    async fn dedupe(
        &self,
        outcomes: &[BidderOutcome],
        _: &BidRequest,
        _: &Account,
        _: Deadline,
    ) -> Result<CategoryMapping, Error> {
        let mut mapping = CategoryMapping::default();
        let mut seen = HashSet::<(&str, Decimal, &str)>::new();
        for outcome in outcomes {
            for bid in &outcome.bids {
                let key = (outcome.bidder.clone(), bid.bid.id.clone());
                let category = bid
                    .bid
                    .cat
                    .iter()
                    .find_map(|category| self.mapping.get(category));
                let Some(category) = category else {
                    if self.with_category {
                        mapping
                            .dropped
                            .push((key, "bid category could not be mapped".to_owned()));
                    }
                    continue;
                };
                let competing = (bid.bid.impid.as_str(), bid.bid.price, category.as_str());
                if self.dedupe && !seen.insert(competing) {
                    mapping.dropped.push((
                        key,
                        format!("duplicate of a bid with category {category} at the same price"),
                    ));
                    continue;
                }
                mapping.categories.insert(key, category.clone());
            }
        }
        Ok(mapping)
    }
}
