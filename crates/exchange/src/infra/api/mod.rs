use {
    crate::{domain::Exchange, infra::observe},
    futures::Future,
    std::{net::SocketAddr, sync::Arc},
    tokio::sync::oneshot,
};

mod error;
mod routes;

pub struct Api {
    pub exchange: Arc<Exchange>,
    pub addr: SocketAddr,
    /// If this channel is specified, the bound address will be sent to it. This
    /// allows the exchange to bind to 0.0.0.0:0 during testing.
    pub addr_sender: Option<oneshot::Sender<SocketAddr>>,
}

impl Api {
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let router = axum::Router::new();
        let router = routes::auction(router);
        let mut app = router.with_state(State(Arc::new(Inner {
            exchange: self.exchange,
        })));

        // Add the metrics and healthz endpoints.
        app = app.merge(::observe::metrics::handle_metrics());
        app = routes::healthz(app);

        app = app
            .layer(axum::middleware::from_fn(::observe::request_id::middleware))
            .layer(tower::ServiceBuilder::new().layer(tower_http::trace::TraceLayer::new_for_http()));

        // Start the server.
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        observe::serving(local_addr);
        if let Some(addr_sender) = self.addr_sender {
            // The receiver only goes away when the caller stopped waiting.
            addr_sender.send(local_addr).ok();
        }
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[derive(Clone)]
struct State(Arc<Inner>);

impl State {
    fn exchange(&self) -> &Exchange {
        &self.0.exchange
    }
}

struct Inner {
    exchange: Arc<Exchange>,
}
