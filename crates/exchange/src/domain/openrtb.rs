//! The parts of the OpenRTB bid request and response the exchange looks at.
//! Everything else is carried through untouched in the flattened `other`
//! maps.

use {
    rust_decimal::Decimal,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    std::collections::{BTreeMap, HashMap},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub imp: Vec<Imp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<Value>,
    /// Maximum time in milliseconds the caller allows for the auction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmax: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cur: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imp {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidResponse {
    pub id: String,
    #[serde(default)]
    pub seatbid: Vec<SeatBid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeatBid {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(default)]
    pub bid: Vec<Bid>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub impid: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cat: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The `ext.prebid` object of a bid request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestPrebid {
    /// Maps an alias to the name of a configured bidder.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub bidadjustmentfactors: HashMap<String, Decimal>,
    #[serde(default)]
    pub currency: Option<RequestCurrency>,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestCurrency {
    #[serde(default)]
    pub rates: BTreeMap<String, BTreeMap<String, Decimal>>,
    /// Whether the exchange's own rates take priority over `rates`.
    #[serde(default = "default_usepbsrates")]
    pub usepbsrates: bool,
}

fn default_usepbsrates() -> bool {
    true
}

impl BidRequest {
    /// Checks the few fields the auction relies on.
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        if self.id.is_empty() {
            return Err(InvalidRequest("request missing required field: \"id\"".into()));
        }
        if self.imp.is_empty() {
            return Err(InvalidRequest("request.imp must contain at least one element".into()));
        }
        for (i, imp) in self.imp.iter().enumerate() {
            if imp.id.is_empty() {
                return Err(InvalidRequest(format!(
                    "request.imp[{i}] missing required field: \"id\""
                )));
            }
        }
        let mut ids = std::collections::HashSet::new();
        if let Some(imp) = self.imp.iter().find(|imp| !ids.insert(imp.id.as_str())) {
            return Err(InvalidRequest(format!(
                "request.imp contains duplicate id \"{}\"",
                imp.id
            )));
        }
        self.prebid()?;
        Ok(())
    }

    /// The publisher id of the site or app, which names the account.
    pub fn account_id(&self) -> Option<String> {
        [&self.site, &self.app]
            .into_iter()
            .flatten()
            .find_map(|source| source.pointer("/publisher/id")?.as_str())
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned)
    }

    pub fn prebid(&self) -> Result<RequestPrebid, InvalidRequest> {
        match self.ext.as_ref().and_then(|ext| ext.get("prebid")) {
            Some(prebid) => serde_json::from_value(prebid.clone())
                .map_err(|err| InvalidRequest(format!("request.ext.prebid is invalid: {err}"))),
            None => Ok(RequestPrebid::default()),
        }
    }

    /// Debug output is requested either explicitly or by marking the request
    /// as a test.
    pub fn debug(&self) -> bool {
        self.test == Some(1)
            || self
                .ext
                .as_ref()
                .and_then(|ext| ext.pointer("/prebid/debug"))
                .and_then(Value::as_bool)
                .unwrap_or_default()
    }
}

impl Imp {
    /// Bidders named by this impression with their parameters.
    pub fn bidders(&self) -> Map<String, Value> {
        self.ext
            .as_ref()
            .and_then(|ext| ext.pointer("/prebid/bidder"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// The media types this impression can be filled with.
    pub fn has(&self, media: &str) -> bool {
        self.other.get(media).is_some_and(|value| !value.is_null())
    }
}

impl Bid {
    /// Sets `ext.<path...>` to `value`, creating intermediate objects.
    pub fn set_ext(&mut self, path: &[&str], value: Value) {
        set_path(&mut self.ext, path, value);
    }
}

impl BidResponse {
    /// Sets `ext.<path...>` to `value`, creating intermediate objects.
    pub fn set_ext(&mut self, path: &[&str], value: Value) {
        set_path(&mut self.ext, path, value);
    }
}

/// Levels along the path that aren't objects are replaced by one.
fn set_path(ext: &mut Option<Value>, path: &[&str], value: Value) {
    let mut current = ext.get_or_insert_with(|| Value::Object(Map::new()));
    for key in path {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(object) = current else {
            unreachable!("value was just made an object");
        };
        current = object.entry(*key).or_insert(Value::Null);
    }
    *current = value;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidRequest(pub String);

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn request(value: Value) -> BidRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn keeps_unknown_fields() {
        let value = json!({
            "id": "req",
            "imp": [{"id": "1", "banner": {"w": 300, "h": 250}}],
            "device": {"ua": "test"},
        });
        let request = request(value.clone());
        assert!(request.imp[0].has("banner"));
        assert!(!request.imp[0].has("video"));
        assert_eq!(serde_json::to_value(&request).unwrap(), value);
    }

    #[test]
    fn validates_required_fields() {
        assert!(request(json!({"id": "req", "imp": [{"id": "1"}]})).validate().is_ok());
        assert!(request(json!({"imp": [{"id": "1"}]})).validate().is_err());
        assert!(request(json!({"id": "req", "imp": []})).validate().is_err());
        assert!(request(json!({"id": "req", "imp": [{}]})).validate().is_err());
        assert!(
            request(json!({"id": "req", "imp": [{"id": "1"}, {"id": "1"}]}))
                .validate()
                .is_err()
        );
        assert!(
            request(json!({"id": "req", "imp": [{"id": "1"}], "ext": {"prebid": {"debug": 7}}}))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn reads_account_and_prebid_ext() {
        let request = request(json!({
            "id": "req",
            "imp": [{"id": "1", "ext": {"prebid": {"bidder": {"alpha": {"zone": 3}}}}}],
            "app": {"publisher": {"id": "pub-7"}},
            "ext": {"prebid": {
                "debug": true,
                "aliases": {"beta": "alpha"},
                "bidadjustmentfactors": {"alpha": 0.5},
                "currency": {"rates": {"EUR": {"USD": 1.25}}},
            }},
        }));
        assert_eq!(request.account_id().as_deref(), Some("pub-7"));
        assert!(request.debug());

        let prebid = request.prebid().unwrap();
        assert_eq!(prebid.aliases["beta"], "alpha");
        assert_eq!(prebid.bidadjustmentfactors["alpha"], Decimal::new(5, 1));
        let currency = prebid.currency.unwrap();
        assert!(currency.usepbsrates);
        assert_eq!(currency.rates["EUR"]["USD"], Decimal::new(125, 2));

        assert_eq!(request.imp[0].bidders()["alpha"], json!({"zone": 3}));
    }

    #[test]
    fn sets_nested_bid_ext() {
        let mut bid = Bid::default();
        bid.set_ext(&["prebid", "category"], json!("sports"));
        bid.set_ext(&["prebid", "winner"], json!(true));
        assert_eq!(
            bid.ext,
            Some(json!({"prebid": {"category": "sports", "winner": true}}))
        );
    }
}
