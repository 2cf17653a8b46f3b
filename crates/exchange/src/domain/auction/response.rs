use {
    super::AggregatedAuctionResult,
    crate::domain::{
        hooks::{ExecutionContext, Rejection},
        openrtb::{BidResponse, SeatBid},
    },
    serde_json::{Map, Value, json},
};

/// Warnings that don't belong to a bidder are reported under this key.
const GENERAL: &str = "prebid";
/// Code of warnings without a more specific one.
const GENERIC_CODE: u32 = 999;

/// Builds the bid response. Only ranked bids are returned: one seat per
/// bidder in auction order, bids in rank order.
pub fn build(result: &AggregatedAuctionResult) -> BidResponse {
    let seatbid = result
        .outcomes
        .iter()
        .filter_map(|outcome| {
            let bid = result
                .ranked
                .iter()
                .filter(|ranked| ranked.bidder == outcome.bidder)
                .filter_map(|ranked| {
                    let bid = outcome
                        .bids
                        .iter()
                        .find(|bid| bid.bid.id == ranked.bid_id)?;
                    let mut out = bid.bid.clone();
                    out.set_ext(&["prebid", "type"], json!(bid.kind));
                    if ranked.winner {
                        out.set_ext(&["prebid", "winner"], json!(true));
                    }
                    let key = (outcome.bidder.clone(), bid.bid.id.clone());
                    if let Some(category) = result.categories.get(&key) {
                        out.set_ext(&["prebid", "category"], json!(category));
                    }
                    Some(out)
                })
                .collect::<Vec<_>>();
            (!bid.is_empty()).then(|| SeatBid {
                seat: Some(outcome.bidder.to_string()),
                bid,
                other: Default::default(),
            })
        })
        .collect();

    let mut errors = Map::new();
    let mut warnings = Map::new();
    let mut response_times = Map::new();
    for outcome in &result.outcomes {
        let bidder = outcome.bidder.to_string();
        if let Some(err) = &outcome.error {
            errors.insert(
                bidder.clone(),
                json!([{ "code": err.code(), "message": err.to_string() }]),
            );
        }
        if !outcome.warnings.is_empty() {
            warnings.insert(bidder.clone(), messages(&outcome.warnings));
        }
        response_times.insert(
            bidder,
            json!(u64::try_from(outcome.response_time.as_millis()).unwrap_or(u64::MAX)),
        );
    }
    if !result.warnings.is_empty() {
        warnings.insert(GENERAL.to_owned(), messages(&result.warnings));
    }

    let rejected = result
        .rejection
        .iter()
        .map(|rejection| json!(rejection))
        .chain(result.rejected.iter().map(|rejected| {
            let mut value = json!(rejected.rejection);
            value["bidder"] = json!(rejected.bidder);
            value
        }))
        .collect::<Vec<_>>();

    let mut ext = Map::new();
    if !errors.is_empty() {
        ext.insert("errors".into(), Value::Object(errors));
    }
    if !warnings.is_empty() {
        ext.insert("warnings".into(), Value::Object(warnings));
    }
    ext.insert("responsetimemillis".into(), Value::Object(response_times));
    if !rejected.is_empty() {
        ext.insert("prebid".into(), json!({ "rejected": rejected }));
    }

    BidResponse {
        id: result.request.id.clone(),
        seatbid,
        cur: Some(result.currency.clone()),
        ext: Some(Value::Object(ext)),
        other: Default::default(),
    }
}

/// The response to a request a hook rejected before the auction started.
pub fn rejected(id: String, currency: &str, rejection: &Rejection) -> BidResponse {
    BidResponse {
        id,
        seatbid: Default::default(),
        cur: Some(currency.to_owned()),
        ext: Some(json!({ "prebid": { "rejected": [rejection] } })),
        other: Default::default(),
    }
}

/// Adds the hook execution trace to `ext.prebid.modules.trace`.
pub fn attach_trace(response: &mut BidResponse, context: &ExecutionContext) {
    response.set_ext(&["prebid", "modules", "trace"], context.trace());
}

fn messages(messages: &[String]) -> Value {
    messages
        .iter()
        .map(|message| json!({ "code": GENERIC_CODE, "message": message }))
        .collect()
}
