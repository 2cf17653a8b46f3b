use {
    crate::domain::hooks::Module,
    reqwest::StatusCode,
    serde_json::Value,
    std::{io::Write, net::SocketAddr, sync::Arc},
    tokio::sync::oneshot,
};

/// HTTP client for talking to the exchange API. Dropping the client shuts
/// down the running exchange instance.
pub struct Client {
    addr: SocketAddr,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
    /// The config file lives as long as the exchange.
    _config: tempfile::NamedTempFile,
}

impl Client {
    pub async fn auction(&self, req: &Value) -> (StatusCode, Value) {
        self.post("", req, &[]).await
    }

    pub async fn auction_with_headers(
        &self,
        req: &Value,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        self.post("", req, headers).await
    }

    pub async fn auction_with_query(&self, query: &str, req: &Value) -> (StatusCode, Value) {
        self.post(query, req, &[]).await
    }

    async fn post(
        &self,
        query: &str,
        req: &Value,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .post(format!("http://{}/openrtb2/auction?{query}", self.addr))
            .header("Content-Type", "application/json")
            .body(req.to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let res = request.send().await.unwrap();
        let status = res.status();
        let text = res.text().await.unwrap();
        tracing::debug!(?status, ?text, "got a response from /openrtb2/auction");
        (status, serde_json::from_str(&text).unwrap())
    }

    /// Sends a raw body to the auction endpoint.
    pub async fn auction_raw(&self, body: &str) -> StatusCode {
        self.client
            .post(format!("http://{}/openrtb2/auction", self.addr))
            .body(body.to_owned())
            .send()
            .await
            .unwrap()
            .status()
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let res = self
            .client
            .get(format!("http://{}{path}", self.addr))
            .send()
            .await
            .unwrap();
        (res.status(), res.text().await.unwrap())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Writes the config to a temporary file and starts the exchange with it.
pub async fn start(config: &str, modules: Vec<Arc<dyn Module>>) -> Client {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(config.as_bytes()).unwrap();
    let args = vec![
        "exchange".to_owned(),
        "--addr=127.0.0.1:0".to_owned(),
        format!("--config={}", file.path().display()),
    ];

    let (addr_sender, addr_receiver) = oneshot::channel();
    let handle = tokio::spawn(async move {
        crate::run(args, modules, Some(addr_sender)).await.unwrap();
    });
    let addr = addr_receiver.await.unwrap();
    Client {
        addr,
        client: reqwest::Client::new(),
        handle,
        _config: file,
    }
}
