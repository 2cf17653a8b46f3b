use {
    crate::{
        domain::hooks::{
            Hook,
            Invocation,
            InvocationResult,
            Module,
            StageHook,
            payload::{BidderRequestPayload, EntrypointPayload},
        },
        tests::setup::{self, Behaviour, setup},
    },
    reqwest::StatusCode,
    serde_json::Value,
    std::sync::Arc,
};

/// Rejects requests and bidders as the account configures it.
struct Gatekeeper;

impl Module for Gatekeeper {
    fn code(&self) -> &str {
        "gatekeeper"
    }

    fn hooks(&self) -> Vec<(String, StageHook)> {
        vec![
            ("entrypoint".into(), StageHook::Entrypoint(Arc::new(Entrypoint))),
            ("bidders".into(), StageHook::BidderRequest(Arc::new(Bidders))),
        ]
    }
}

struct Entrypoint;

#[async_trait::async_trait]
impl Hook<EntrypointPayload> for Entrypoint {
    async fn call(
        &self,
        payload: &EntrypointPayload,
        _: &Invocation,
    ) -> anyhow::Result<InvocationResult<EntrypointPayload>> {
        Ok(if payload.query_params.contains_key("blocked") {
            InvocationResult::reject("blocked by query")
        } else {
            InvocationResult::no_action()
        })
    }
}

struct Bidders;

#[async_trait::async_trait]
impl Hook<BidderRequestPayload> for Bidders {
    async fn call(
        &self,
        _: &BidderRequestPayload,
        invocation: &Invocation,
    ) -> anyhow::Result<InvocationResult<BidderRequestPayload>> {
        let Some(bidder) = &invocation.bidder else {
            return Ok(InvocationResult::no_action());
        };
        let blocked = invocation
            .account_config
            .as_ref()
            .and_then(|config| config.get("reject"))
            .and_then(Value::as_array)
            .is_some_and(|blocked| {
                blocked
                    .iter()
                    .any(|name| name.as_str() == Some(bidder.as_str()))
            });
        Ok(if blocked {
            InvocationResult::reject("bidder blocked")
        } else {
            InvocationResult::no_action()
        })
    }
}

const CONFIG: &str = r#"
[[account]]
id = "pub-1"

[account.hooks.modules.gatekeeper]
reject = ["beta"]

[[account.hooks.execution-plan.stages.bidder-request.groups]]
timeout = "50ms"
hook-sequence = [{ module-code = "gatekeeper", hook-impl-code = "bidders" }]

[[hooks.host-execution-plan.stages.entrypoint.groups]]
timeout = "50ms"
hook-sequence = [{ module-code = "gatekeeper", hook-impl-code = "entrypoint" }]
"#;

#[tokio::test]
async fn rejected_bidder_is_never_called() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(0, "1", 1.0))
        .bidder("beta", Behaviour::bid(0, "1", 3.0))
        .module(Arc::new(Gatekeeper))
        .config(CONFIG)
        .done()
        .await;

    let (status, response) = test
        .client
        .auction(&setup::request(&["alpha", "beta"]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(test.bidder("alpha").received().len(), 1);
    assert!(test.bidder("beta").received().is_empty());
    let seats = response["seatbid"].as_array().unwrap();
    assert_eq!(seats.len(), 1);
    assert_eq!(seats[0]["seat"], "alpha");
    assert_eq!(response["ext"]["errors"]["beta"][0]["code"], 5);
    let rejected = &response["ext"]["prebid"]["rejected"][0];
    assert_eq!(rejected["bidder"], "beta");
    assert_eq!(rejected["stage"], "bidder-request");
    assert_eq!(rejected["reason"], "bidder blocked");
}

#[tokio::test]
async fn entrypoint_rejection_skips_all_bidders() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(0, "1", 1.0))
        .module(Arc::new(Gatekeeper))
        .config(CONFIG)
        .done()
        .await;

    let (status, response) = test
        .client
        .auction_with_query("blocked=1", &setup::request(&["alpha"]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(test.bidder("alpha").received().is_empty());
    assert_eq!(response["id"], "req-1");
    assert_eq!(response["seatbid"], serde_json::json!([]));
    let rejected = &response["ext"]["prebid"]["rejected"][0];
    assert_eq!(rejected["stage"], "entrypoint");
    assert_eq!(rejected["reason"], "blocked by query");
}

#[tokio::test]
async fn debug_requests_get_the_hook_trace() {
    let test = setup()
        .bidder("alpha", Behaviour::bid(0, "1", 1.0))
        .module(Arc::new(Gatekeeper))
        .config(CONFIG)
        .done()
        .await;

    let mut request = setup::request(&["alpha"]);
    request["test"] = 1.into();
    let (status, response) = test.client.auction(&request).await;

    assert_eq!(status, StatusCode::OK);
    let trace = &response["ext"]["prebid"]["modules"]["trace"];
    let stages = trace["stages"].as_array().unwrap();
    assert!(
        stages.iter().any(|stage| stage["stage"] == "entrypoint"),
        "{trace}"
    );
}
