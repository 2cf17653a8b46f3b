//! Bidders that speak OpenRTB 2.x: the request is forwarded as is and the
//! response is a bid response.

use {
    super::{Adapter, HttpCall},
    crate::{
        domain::{
            bidder::{BidType, BidderBid, BidderError, SeatBid},
            currency,
            openrtb::{Bid, BidRequest, BidResponse},
        },
        util::http,
    },
    reqwest::StatusCode,
    serde_json::Value,
    url::Url,
};

pub struct OpenRtb;

impl Adapter for OpenRtb {
    fn make_requests(
        &self,
        request: &BidRequest,
        endpoint: &Url,
    ) -> Result<Vec<HttpCall>, BidderError> {
        let body = serde_json::to_string(request)
            .map_err(|err| BidderError::Internal(format!("failed to encode request: {err}")))?;
        Ok(vec![HttpCall {
            method: reqwest::Method::POST,
            uri: endpoint.clone(),
            headers: vec![
                ("Content-Type".into(), "application/json;charset=utf-8".into()),
                ("Accept".into(), "application/json".into()),
            ],
            body,
        }])
    }

    fn make_bids(
        &self,
        request: &BidRequest,
        response: &http::Response,
    ) -> Result<SeatBid, BidderError> {
        match response.status {
            StatusCode::NO_CONTENT => return Ok(SeatBid::default()),
            StatusCode::OK => (),
            status => {
                return Err(BidderError::InvalidResponse(format!(
                    "unexpected status code {status}"
                )));
            }
        }
        let response: BidResponse = serde_json::from_str(&response.body)
            .map_err(|err| BidderError::InvalidResponse(err.to_string()))?;
        let currency = response
            .cur
            .filter(|cur| !cur.is_empty())
            .unwrap_or_else(|| currency::DEFAULT.to_owned());

        Ok(SeatBid {
            bids: response
                .seatbid
                .into_iter()
                .flat_map(|seat| seat.bid)
                .map(|bid| BidderBid {
                    kind: kind(request, &bid),
                    currency: currency.clone(),
                    bid,
                })
                .collect(),
            warnings: Default::default(),
        })
    }
}

/// The media type of a bid. Bidders may state it in `ext.prebid.type`,
/// otherwise it is inferred from the impression.
fn kind(request: &BidRequest, bid: &Bid) -> BidType {
    let declared = bid
        .ext
        .as_ref()
        .and_then(|ext| ext.pointer("/prebid/type"))
        .and_then(Value::as_str)
        .and_then(|kind| kind.parse().ok());
    if let Some(kind) = declared {
        return kind;
    }
    let Some(imp) = request.imp.iter().find(|imp| imp.id == bid.impid) else {
        return BidType::Banner;
    };
    [
        BidType::Banner,
        BidType::Video,
        BidType::Audio,
        BidType::Native,
    ]
    .into_iter()
    .find(|kind| imp.has(&kind.to_string()))
    .unwrap_or(BidType::Banner)
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn request() -> BidRequest {
        serde_json::from_value(json!({
            "id": "req",
            "imp": [
                {"id": "1", "banner": {"w": 300, "h": 250}},
                {"id": "2", "video": {"mimes": ["video/mp4"]}},
            ],
        }))
        .unwrap()
    }

    fn response(status: StatusCode, body: Value) -> http::Response {
        http::Response {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn posts_the_request_as_json() {
        let endpoint = Url::parse("http://bidder.test/openrtb").unwrap();
        let calls = OpenRtb.make_requests(&request(), &endpoint).unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, reqwest::Method::POST);
        assert_eq!(calls[0].uri, endpoint);
        let body: BidRequest = serde_json::from_str(&calls[0].body).unwrap();
        assert_eq!(body, request());
    }

    #[test]
    fn reads_bids_with_their_media_type() {
        let seat = OpenRtb
            .make_bids(
                &request(),
                &response(
                    StatusCode::OK,
                    json!({
                        "id": "req",
                        "seatbid": [{"bid": [
                            {"id": "a", "impid": "1", "price": 1.2},
                            {"id": "b", "impid": "2", "price": 0.4},
                            {"id": "c", "impid": "1", "price": 2,
                                "ext": {"prebid": {"type": "native"}}},
                        ]}],
                    }),
                ),
            )
            .unwrap();

        let bids = seat
            .bids
            .iter()
            .map(|bid| (bid.bid.id.as_str(), bid.kind, bid.currency.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            bids,
            vec![
                ("a", BidType::Banner, "USD"),
                ("b", BidType::Video, "USD"),
                ("c", BidType::Native, "USD"),
            ]
        );
    }

    #[test]
    fn uses_response_currency() {
        let seat = OpenRtb
            .make_bids(
                &request(),
                &response(
                    StatusCode::OK,
                    json!({
                        "id": "req",
                        "cur": "EUR",
                        "seatbid": [{"bid": [{"id": "a", "impid": "1", "price": 1}]}],
                    }),
                ),
            )
            .unwrap();
        assert_eq!(seat.bids[0].currency, "EUR");
    }

    #[test]
    fn no_content_means_no_bids() {
        let seat = OpenRtb
            .make_bids(
                &request(),
                &http::Response {
                    status: StatusCode::NO_CONTENT,
                    body: String::new(),
                },
            )
            .unwrap();
        assert_eq!(seat, SeatBid::default());
    }

    #[test]
    fn bad_responses_are_invalid() {
        let err = OpenRtb
            .make_bids(
                &request(),
                &response(StatusCode::INTERNAL_SERVER_ERROR, json!({})),
            )
            .unwrap_err();
        assert_eq!(err.code(), 3);

        let err = OpenRtb
            .make_bids(
                &request(),
                &http::Response {
                    status: StatusCode::OK,
                    body: "not json".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, BidderError::InvalidResponse(_)));
    }
}
