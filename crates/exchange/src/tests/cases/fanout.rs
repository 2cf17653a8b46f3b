use {
    crate::tests::setup::{self, Behaviour, setup},
    reqwest::StatusCode,
    std::time::{Duration, Instant},
};

/// One bidder responds quickly, one never responds and one refuses the
/// connection. The auction ends at the deadline with the fast bidder's bid.
#[tokio::test]
async fn fast_hanging_and_unreachable_bidders() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(10, "1", 1.5))
        .bidder("beta", Behaviour::Hang)
        .unreachable_bidder("gamma")
        .done()
        .await;

    let started = Instant::now();
    let (status, response) = test
        .client
        .auction(&setup::request(&["alpha", "beta", "gamma"]))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
    assert_eq!(response["id"], "req-1");
    assert_eq!(response["cur"], "USD");
    let seats = response["seatbid"].as_array().unwrap();
    assert_eq!(seats.len(), 1);
    assert_eq!(seats[0]["seat"], "alpha");
    assert_eq!(seats[0]["bid"][0]["price"], 1.5);
    assert_eq!(seats[0]["bid"][0]["ext"]["prebid"]["type"], "banner");
    assert_eq!(seats[0]["bid"][0]["ext"]["prebid"]["winner"], true);

    let errors = &response["ext"]["errors"];
    assert!(errors.get("alpha").is_none());
    assert_eq!(errors["beta"][0]["code"], 1);
    assert_eq!(errors["gamma"][0]["code"], 4);
    let times = &response["ext"]["responsetimemillis"];
    for bidder in ["alpha", "beta", "gamma"] {
        assert!(times[bidder].is_u64(), "{bidder} has no response time");
    }
}

#[tokio::test]
async fn highest_bid_wins() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(5, "1", 0.8))
        .bidder("beta", Behaviour::bid(20, "1", 2.1))
        .bidder(
            "gamma",
            Behaviour::Status {
                delay: Duration::from_millis(5),
                status: StatusCode::NO_CONTENT,
            },
        )
        .done()
        .await;

    let (status, response) = test
        .client
        .auction(&setup::request(&["alpha", "beta", "gamma"]))
        .await;

    assert_eq!(status, StatusCode::OK);
    let seats = response["seatbid"].as_array().unwrap();
    assert_eq!(seats.len(), 2);
    assert_eq!(seats[0]["seat"], "alpha");
    assert!(seats[0]["bid"][0]["ext"]["prebid"].get("winner").is_none());
    assert_eq!(seats[1]["seat"], "beta");
    assert_eq!(seats[1]["bid"][0]["ext"]["prebid"]["winner"], true);
    assert!(response["ext"].get("errors").is_none());
}

#[tokio::test]
async fn bidders_only_see_their_params_and_the_request_id() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(0, "1", 1.0))
        .done()
        .await;

    let mut request = setup::request(&["alpha"]);
    request["imp"][0]["ext"]["prebid"]["bidder"]["alpha"] = serde_json::json!({"zone": 7});
    let (status, _) = test
        .client
        .auction_with_headers(&request, &[(::observe::request_id::HEADER, "trace-42")])
        .await;

    assert_eq!(status, StatusCode::OK);
    let received = test.bidder("alpha").received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].request_id.as_deref(), Some("trace-42"));
    assert_eq!(received[0].body["imp"][0]["ext"], serde_json::json!({"bidder": {"zone": 7}}));
    assert!(received[0].body["tmax"].as_u64().unwrap() <= 200);
}
