use {
    axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    },
    serde_json::{Value, json},
    std::{
        net::SocketAddr,
        sync::{Arc, Mutex},
        time::Duration,
    },
};

/// How a fake bidder answers bid requests.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Responds after `delay` with one bid per listed `(impid, price)`.
    Bids {
        delay: Duration,
        bids: Vec<(&'static str, f64)>,
    },
    /// Responds after `delay` with an empty body and the status.
    Status { delay: Duration, status: StatusCode },
    /// Never responds.
    Hang,
}

impl Behaviour {
    pub fn bid(delay_ms: u64, impid: &'static str, price: f64) -> Self {
        Self::Bids {
            delay: Duration::from_millis(delay_ms),
            bids: vec![(impid, price)],
        }
    }
}

/// A bid request the fake bidder received.
#[derive(Debug, Clone)]
pub struct Received {
    pub body: Value,
    pub request_id: Option<String>,
}

/// A bidder that was started as part of the setup.
#[derive(Debug, Clone)]
pub struct Bidder {
    pub name: String,
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
}

impl Bidder {
    pub fn endpoint(&self) -> String {
        format!("http://{}/bid", self.addr)
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
struct Inner {
    name: String,
    behaviour: Behaviour,
    received: Arc<Mutex<Vec<Received>>>,
}

/// Set up an HTTP server acting as an OpenRTB bidder.
pub async fn start(name: &str, behaviour: Behaviour) -> Bidder {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = axum::Router::new()
        .route("/bid", axum::routing::post(route))
        .with_state(Inner {
            name: name.to_owned(),
            behaviour,
            received: received.clone(),
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    Bidder {
        name: name.to_owned(),
        addr,
        received,
    }
}

/// An endpoint nobody listens on.
pub async fn unreachable(name: &str) -> Bidder {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Bidder {
        name: name.to_owned(),
        addr,
        received: Default::default(),
    }
}

async fn route(State(state): State<Inner>, headers: HeaderMap, body: String) -> Response {
    let body: Value = serde_json::from_str(&body).unwrap();
    state.received.lock().unwrap().push(Received {
        body: body.clone(),
        request_id: headers
            .get(::observe::request_id::HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned),
    });

    match state.behaviour {
        Behaviour::Bids { delay, bids } => {
            tokio::time::sleep(delay).await;
            let bids = bids
                .into_iter()
                .enumerate()
                .map(|(i, (impid, price))| {
                    json!({
                        "id": format!("{}-{i}", state.name),
                        "impid": impid,
                        "price": price,
                        "adm": "<creative/>",
                    })
                })
                .collect::<Vec<_>>();
            axum::Json(json!({
                "id": body["id"],
                "seatbid": [{"bid": bids}],
            }))
            .into_response()
        }
        Behaviour::Status { delay, status } => {
            tokio::time::sleep(delay).await;
            status.into_response()
        }
        Behaviour::Hang => std::future::pending().await,
    }
}
