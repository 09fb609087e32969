use std::net::SocketAddr;
use std::sync::Arc;

use relay_common::Result;
use relay_config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Binds the status endpoint and runs the metrics sampler alongside it.
pub struct GatewayServer {
    config: AppConfig,
}

impl GatewayServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Fails before binding if the config is unusable (e.g. no secret).
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.gateway.host, self.config.gateway.port);
        let interval = self.config.metrics.interval();

        let state = Arc::new(AppState::from_config(self.config)?);
        let _sampler = state.sampler.start(interval);
        state.spawn_limiter_cleanup();

        let app = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        info!("relay agent listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| relay_common::Error::Gateway(format!("server error: {e}")))?;

        Ok(())
    }
}
