//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::{router, GatewayState};
use crate::error::{FxGateError, Result};

/// HTTP server for the exchange-rate gateway.
pub struct GatewayServer {
    /// Bound listener
    listener: TcpListener,
    /// Shared handler state
    state: GatewayState,
}

impl GatewayServer {
    /// Bind the listen address.
    pub async fn bind(addr: SocketAddr, state: GatewayState) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(addr = %addr, error = %e, "Failed to bind listen address");
            FxGateError::Io(e)
        })?;
        Ok(Self { listener, state })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `signal` resolves.
    ///
    /// When it does, the gateway's shutdown token is cancelled so in-flight
    /// upstream lookups stop waiting, then open connections are drained.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        let shutdown = self.state.shutdown.clone();
        let app = router(self.state);

        info!(addr = %addr, "Starting HTTP gateway");

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                shutdown.cancel();
            })
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP gateway failed");
                FxGateError::Server(e.to_string())
            })
    }
}
