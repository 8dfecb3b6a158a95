use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fxgate::auth::BearerAuthenticator;
use fxgate::catalog::Catalog;
use fxgate::config::{GatewayConfig, LogFormat, LoggingConfig};
use fxgate::gateway::{GatewayServer, GatewayState};
use fxgate::ratelimit::RateLimiter;
use fxgate::rates::{CachingRateSource, MemoryStore, RateSource, RateTable};

#[derive(Debug, Parser)]
#[command(name = "fxgate", version, about = "Exchange-rate gateway")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    init_tracing(&config.logging);

    info!("Starting FxGate exchange-rate gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        listen_addr = %config.server.listen_addr,
        currencies = config.upstream.usd_rates.len(),
        cache_ttl_secs = config.cache.ttl_secs,
        "Configuration loaded"
    );

    let upstream = RateTable::with_latency(config.upstream.usd_rates.clone(), config.upstream.latency());
    let rates: Arc<dyn RateSource> = Arc::new(CachingRateSource::with_ttl(
        upstream,
        Arc::new(MemoryStore::new()),
        config.cache.ttl(),
    ));

    let limiter = if config.rate_limiting.enabled {
        let policy = config.rate_limiting.policy();
        info!(
            max_requests = policy.max_requests,
            period_secs = policy.period.as_secs(),
            "Rate limiter initialized"
        );
        Some(Arc::new(RateLimiter::new(policy)))
    } else {
        warn!("Rate limiting is disabled");
        None
    };

    if config.auth.tenants.is_empty() {
        warn!("No tenants configured; every protected request will be rejected");
    }

    let state = GatewayState {
        rates,
        limiter,
        authenticator: Arc::new(BearerAuthenticator::new(config.auth.tenants.clone())),
        catalog: Arc::new(Catalog::default()),
        supported: Arc::new(config.upstream.usd_rates.keys().cloned().collect()),
        shutdown: CancellationToken::new(),
    };

    GatewayServer::bind(config.server.listen_addr, state)
        .await?
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("FxGate stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
