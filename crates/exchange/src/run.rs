use {
    crate::{
        domain::{
            Exchange,
            hooks::{Executor, Module, Registry},
        },
        infra::{self, Api, bidder, cli, config, observe, settings},
    },
    anyhow::Context,
    clap::Parser,
    std::{net::SocketAddr, sync::Arc, time::Duration},
    tokio::sync::oneshot,
};

/// Runs the exchange binary. Startup failures are logged and end the
/// process.
pub async fn start(args: impl Iterator<Item = String>) {
    if let Err(err) = run(args, Vec::new(), None).await {
        tracing::error!(?err, "exchange failed");
        std::process::exit(1);
    }
}

/// This function exists to enable running the exchange for testing. The
/// `addr_sender` parameter is used so that the testing framework can get the
/// address of the server and connect to it. `modules` are the hook modules
/// execution plans may refer to.
pub async fn run(
    args: impl IntoIterator<Item = String>,
    modules: Vec<Arc<dyn Module>>,
    addr_sender: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let args = cli::Args::parse_from(args);
    observe::init(&args);
    let config = config::file::load(&args.config).await?;
    let exchange = exchange(config, &modules)?;

    let (shutdown_sender, shutdown_receiver) = oneshot::channel();
    let serve = Api {
        exchange: Arc::new(exchange),
        addr: args.addr,
        addr_sender,
    }
    .serve(async {
        let _ = shutdown_receiver.await;
    });

    futures::pin_mut!(serve);
    tokio::select! {
        result = &mut serve => {
            result.context("serve task failed")?;
            anyhow::bail!("serve task exited");
        }
        _ = shutdown_signal() => {
            shutdown_sender.send(()).ok();
            tokio::time::timeout(Duration::from_secs(10), serve)
                .await
                .context("API shutdown exceeded timeout")?
                .context("API failed during shutdown")?;
        }
    };
    Ok(())
}

fn exchange(config: infra::Config, modules: &[Arc<dyn Module>]) -> anyhow::Result<Exchange> {
    let registry = Registry::new(modules)?;
    let hooks = Executor::new(registry, config.hooks).context("invalid hooks configuration")?;
    let settings = settings::Static::new(config.settings);
    for account in settings.accounts() {
        if let Some(plan) = &account.hooks.execution_plan {
            hooks
                .validate(plan)
                .with_context(|| format!("invalid execution plan of account {:?}", account.id))?;
        }
    }

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let exchange = Exchange::new(
        config.auction,
        bidder::catalog(&config.bidders, &client),
        Arc::new(settings),
        hooks,
        Arc::new(config.currency),
    );
    Ok(match config.category {
        Some(category) => exchange.with_categories(Arc::new(category)),
        None => exchange,
    })
}

#[cfg(unix)]
async fn shutdown_signal() {
    // Intercept signals for graceful shutdown. Kubernetes sends sigterm, Ctrl-C
    // sends sigint.
    let signal = |kind| async move {
        match tokio::signal::unix::signal(kind) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(?err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    let sigterm = signal(tokio::signal::unix::SignalKind::terminate());
    let sigint = signal(tokio::signal::unix::SignalKind::interrupt());
    futures::pin_mut!(sigint);
    futures::pin_mut!(sigterm);
    futures::future::select(sigterm, sigint).await;
}

#[cfg(windows)]
async fn shutdown_signal() {
    // No support for signal handling on Windows.
    std::future::pending().await
}
