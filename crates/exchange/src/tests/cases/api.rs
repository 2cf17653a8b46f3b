use {
    crate::tests::setup::{self, Behaviour, setup},
    reqwest::StatusCode,
};

#[tokio::test]
async fn malformed_requests_are_refused() {
    let test = setup().done().await;

    assert_eq!(test.client.auction_raw("{not json").await, StatusCode::BAD_REQUEST);

    let (status, response) = test
        .client
        .auction(&serde_json::json!({"id": "req", "imp": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["kind"], "InvalidRequest");
    assert_eq!(
        response["description"],
        "request.imp must contain at least one element"
    );
}

#[tokio::test]
async fn unknown_accounts_are_unauthorized_when_required() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(0, "1", 1.0))
        .config(
            r#"
[settings]
require-account = true

[[account]]
id = "pub-2"
"#,
        )
        .done()
        .await;

    let (status, response) = test.client.auction(&setup::request(&["alpha"])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["kind"], "UnknownAccount");
    assert!(test.bidder("alpha").received().is_empty());

    let mut request = setup::request(&["alpha"]);
    request["site"]["publisher"]["id"] = "pub-2".into();
    let (status, _) = test.client.auction(&request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_and_metrics() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(0, "1", 1.0))
        .done()
        .await;

    let (status, _) = test.client.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = test.client.auction(&setup::request(&["alpha"])).await;
    assert_eq!(status, StatusCode::OK);
    let (status, metrics) = test.client.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(metrics.contains("bidder_requests"), "{metrics}");
}
