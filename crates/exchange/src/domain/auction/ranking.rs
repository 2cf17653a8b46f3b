use {
    crate::domain::bidder::{BidderOutcome, Name},
    rust_decimal::Decimal,
    std::collections::HashSet,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RankedBid {
    pub bidder: Name,
    pub bid_id: String,
    pub impid: String,
    pub price: Decimal,
    /// The highest bid of its impression.
    pub winner: bool,
}

/// Orders all bids in `currency` by price, highest first. Only bids in the
/// auction currency can be compared, others are left out.
///
/// Equal prices keep bidder order, so for every impression the winner is the
/// highest bid of the bidder that comes first.
pub fn rank(outcomes: &[BidderOutcome], currency: &str) -> Vec<RankedBid> {
    let mut ranked = outcomes
        .iter()
        .flat_map(|outcome| {
            outcome
                .bids
                .iter()
                .filter(|bid| bid.currency.eq_ignore_ascii_case(currency))
                .map(|bid| RankedBid {
                    bidder: outcome.bidder.clone(),
                    bid_id: bid.bid.id.clone(),
                    impid: bid.bid.impid.clone(),
                    price: bid.bid.price,
                    winner: false,
                })
        })
        .collect::<Vec<_>>();
    // Stable, ties stay in bidder order.
    ranked.sort_by(|a, b| b.price.cmp(&a.price));

    let mut filled = HashSet::new();
    for bid in &mut ranked {
        bid.winner = filled.insert(bid.impid.clone());
    }
    ranked
}
