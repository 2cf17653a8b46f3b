use {
    crate::domain::{bidder::BidderBid, openrtb::BidRequest},
    rust_decimal::Decimal,
};

/// Drops bids the auction can't use. Every dropped bid leaves a warning.
pub fn validate(request: &BidRequest, bids: Vec<BidderBid>) -> (Vec<BidderBid>, Vec<String>) {
    let mut warnings = Vec::new();
    let bids = bids
        .into_iter()
        .filter(|bid| match problem(request, bid) {
            Some(problem) => {
                warnings.push(problem);
                false
            }
            None => true,
        })
        .collect();
    (bids, warnings)
}

fn problem(request: &BidRequest, bid: &BidderBid) -> Option<String> {
    let bid = &bid.bid;
    if bid.id.is_empty() {
        return Some("bid missing required field \"id\"".to_owned());
    }
    if bid.impid.is_empty() {
        return Some(format!("bid \"{}\" missing required field \"impid\"", bid.id));
    }
    if !request.imp.iter().any(|imp| imp.id == bid.impid) {
        return Some(format!(
            "bid \"{}\" is for unknown impression \"{}\"",
            bid.id, bid.impid
        ));
    }
    if bid.price <= Decimal::ZERO {
        return Some(format!(
            "bid \"{}\" has non-positive price {}",
            bid.id, bid.price
        ));
    }
    None
}

/// Applies a bid adjustment factor to every price. Bids whose adjusted price
/// doesn't fit a decimal are dropped with a warning.
pub fn adjust(bids: Vec<BidderBid>, factor: Decimal) -> (Vec<BidderBid>, Vec<String>) {
    if factor == Decimal::ONE {
        return (bids, Vec::new());
    }
    let mut warnings = Vec::new();
    let bids = bids
        .into_iter()
        .filter_map(|mut bid| match bid.bid.price.checked_mul(factor) {
            Some(price) => {
                bid.bid.price = price;
                Some(bid)
            }
            None => {
                warnings.push(format!(
                    "bid \"{}\" dropped: adjustment factor {factor} overflows price {}",
                    bid.bid.id, bid.bid.price
                ));
                None
            }
        })
        .collect();
    (bids, warnings)
}
