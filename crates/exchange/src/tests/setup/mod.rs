//! Starts the exchange with fake bidders for end to end tests.

use {
    crate::domain::hooks::Module,
    serde_json::{Value, json},
    std::{collections::HashMap, sync::Arc},
};

pub mod bidder;
pub mod exchange;

pub use bidder::Behaviour;

enum Participant {
    Running(Behaviour),
    Unreachable,
}

/// Create a builder for the setup process.
pub fn setup() -> Setup {
    Setup {
        bidders: Default::default(),
        modules: Default::default(),
        config: Default::default(),
    }
}

pub struct Setup {
    bidders: Vec<(String, Participant)>,
    modules: Vec<Arc<dyn Module>>,
    config: String,
}

impl Setup {
    /// Add a fake bidder.
    pub fn bidder(mut self, name: &str, behaviour: Behaviour) -> Self {
        self.bidders
            .push((name.to_owned(), Participant::Running(behaviour)));
        self
    }

    /// Add a bidder whose endpoint refuses connections.
    pub fn unreachable_bidder(mut self, name: &str) -> Self {
        self.bidders.push((name.to_owned(), Participant::Unreachable));
        self
    }

    /// Register a hook module.
    pub fn module(mut self, module: Arc<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Additional TOML configuration appended after the bidders.
    pub fn config(mut self, config: &str) -> Self {
        self.config.push_str(config);
        self.config.push('\n');
        self
    }

    /// Start the bidders and the exchange.
    pub async fn done(self) -> Test {
        let mut bidders = HashMap::new();
        let mut config = String::new();
        for (name, participant) in self.bidders {
            let bidder = match participant {
                Participant::Running(behaviour) => bidder::start(&name, behaviour).await,
                Participant::Unreachable => bidder::unreachable(&name).await,
            };
            config.push_str(&format!(
                "[[bidder]]\nname = \"{name}\"\nendpoint = \"{}\"\n\n",
                bidder.endpoint()
            ));
            bidders.insert(name, bidder);
        }
        config.push_str(&self.config);

        ::observe::tracing::initialize_reentrant("exchange=debug");
        let client = exchange::start(&config, self.modules).await;
        Test { client, bidders }
    }
}

pub struct Test {
    pub client: exchange::Client,
    bidders: HashMap<String, bidder::Bidder>,
}

impl Test {
    pub fn bidder(&self, name: &str) -> &bidder::Bidder {
        &self.bidders[name]
    }
}

/// A bid request with one banner impression addressed to the bidders.
pub fn request(bidders: &[&str]) -> Value {
    let params = bidders
        .iter()
        .map(|bidder| (bidder.to_string(), json!({})))
        .collect::<serde_json::Map<_, _>>();
    json!({
        "id": "req-1",
        "imp": [{
            "id": "1",
            "banner": {"w": 300, "h": 250},
            "ext": {"prebid": {"bidder": params}},
        }],
        "site": {"publisher": {"id": "pub-1"}},
        "tmax": 200,
    })
}
