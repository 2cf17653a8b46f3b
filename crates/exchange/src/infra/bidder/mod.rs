//! Calling bidders over HTTP.
//!
//! A bidder integration only translates: [`Adapter::make_requests`] turns the
//! bidder's share of the auction into HTTP calls and [`Adapter::make_bids`]
//! turns each response back into bids. Sending the calls, enforcing the
//! deadline and limiting response sizes is the same for every bidder and
//! lives in [`Http`].

use {
    crate::{
        domain::{
            Deadline,
            bidder::{self, BidderError, BidderRequest, Catalog, Invoker, SeatBid},
            openrtb::BidRequest,
        },
        infra::observe,
        util::http,
    },
    serde::Deserialize,
    std::sync::Arc,
    url::Url,
};

pub mod openrtb;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCall {
    pub method: reqwest::Method,
    pub uri: Url,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// A bidder integration.
pub trait Adapter: Send + Sync {
    fn make_requests(
        &self,
        request: &BidRequest,
        endpoint: &Url,
    ) -> Result<Vec<HttpCall>, BidderError>;

    fn make_bids(
        &self,
        request: &BidRequest,
        response: &http::Response,
    ) -> Result<SeatBid, BidderError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum AdapterKind {
    /// Forwards the request as OpenRTB JSON.
    #[default]
    #[serde(rename = "openrtb")]
    OpenRtb,
}

impl AdapterKind {
    fn adapter(self) -> Arc<dyn Adapter> {
        match self {
            Self::OpenRtb => Arc::new(openrtb::OpenRtb),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub name: bidder::Name,
    pub endpoint: Url,
    pub adapter: AdapterKind,
    pub cookie_family: String,
    pub enabled: bool,
    pub response_size_limit: usize,
}

/// Builds the catalog of all configured bidders. Every bidder shares the
/// client's connection pool.
pub fn catalog(configs: &[Config], client: &reqwest::Client) -> Catalog {
    configs.iter().fold(Catalog::default(), |catalog, config| {
        catalog.with(
            config.name.clone(),
            bidder::Entry {
                invoker: Arc::new(Http::new(config, client.clone())),
                cookie_family: config.cookie_family.clone(),
                enabled: config.enabled,
            },
        )
    })
}

/// Invokes a bidder by sending the adapter's calls.
pub struct Http {
    name: bidder::Name,
    endpoint: Url,
    adapter: Arc<dyn Adapter>,
    client: reqwest::Client,
    response_size_limit: usize,
}

impl Http {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            name: config.name.clone(),
            endpoint: config.endpoint.clone(),
            adapter: config.adapter.adapter(),
            client,
            response_size_limit: config.response_size_limit,
        }
    }

    /// Sends a single call. The call is cancelled when the deadline passes.
    async fn send(
        &self,
        call: HttpCall,
        deadline: Deadline,
    ) -> Result<http::Response, BidderError> {
        let timeout = deadline
            .try_remaining()
            .map_err(|_| BidderError::Timeout)?;
        let HttpCall {
            method,
            uri,
            headers,
            body,
        } = call;
        observe::bidder_call(&self.name, &method, &uri);
        let mut request = self
            .client
            .request(method, uri)
            .timeout(timeout)
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(id) = ::observe::request_id::get_task_local_storage() {
            request = request.header(::observe::request_id::HEADER, id);
        }

        let response = tokio::time::timeout_at(
            deadline.instant(),
            http::send(self.response_size_limit, request),
        )
        .await;
        match response {
            Err(_) => Err(BidderError::Timeout),
            Ok(Err(err)) if err.is_timeout() => Err(BidderError::Timeout),
            Ok(Err(err @ http::Error::Response(_))) => {
                Err(BidderError::Connection(err.to_string()))
            }
            Ok(Err(err)) => Err(BidderError::InvalidResponse(err.to_string())),
            Ok(Ok(response)) => Ok(response),
        }
    }
}

#[async_trait::async_trait]
impl Invoker for Http {
    async fn request_bids(
        &self,
        request: &BidderRequest,
        deadline: Deadline,
    ) -> Result<SeatBid, BidderError> {
        let calls = self
            .adapter
            .make_requests(&request.request, &self.endpoint)?;
        let total = calls.len();
        let responses =
            futures::future::join_all(calls.into_iter().map(|call| self.send(call, deadline)))
                .await;

        let mut seat = SeatBid::default();
        let mut errors = Vec::new();
        for response in responses {
            let bids = response
                .and_then(|response| self.adapter.make_bids(&request.request, &response));
            match bids {
                Ok(bids) => {
                    seat.bids.extend(bids.bids);
                    seat.warnings.extend(bids.warnings);
                }
                Err(err) => errors.push(err),
            }
        }

        // A bidder only fails when none of its calls succeeded.
        let failed = errors.len();
        let mut errors = errors.into_iter();
        if failed > 0 && failed == total {
            if let Some(err) = errors.next() {
                return Err(err);
            }
        }
        seat.warnings.extend(errors.map(|err| err.to_string()));
        Ok(seat)
    }
}
