//! HTTP surface lifecycle.
//!
//! `new()` captures shared state, `start()` binds the listener and `serve()`
//! answers requests until the shutdown future resolves. Readiness is owned
//! by the node: this module only reports it.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{health_handler, liveness_handler, readiness_handler, AppState};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;

/// Serves the health endpoints of one node.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        shutdown: Arc<ShutdownController>,
        bus_address: &str,
    ) -> Self {
        let state = AppState {
            shutdown,
            config: Arc::new(config.clone()),
            bus_address: Arc::from(bus_address),
            start_time: Instant::now(),
        };
        Self {
            config,
            listener: None,
            state,
        }
    }

    /// Routes:
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the listener and returns the actual port, which differs from
    /// the configured one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "health endpoint bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("health endpoint closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    fn module() -> (NetworkModule, Arc<ShutdownController>) {
        let shutdown = Arc::new(ShutdownController::new());
        let module = NetworkModule::new(
            NetworkConfig::default(),
            Arc::clone(&shutdown),
            "wikidb.queue",
        );
        (module, shutdown)
    }

    async fn status_of(router: Router, path: &str) -> StatusCode {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn readiness_follows_the_shared_controller() {
        let (module, shutdown) = module();

        assert_eq!(
            status_of(module.build_router(), "/health/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        shutdown.set_ready();
        assert_eq!(
            status_of(module.build_router(), "/health/ready").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(module.build_router(), "/health/live").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (module, _) = module();
        assert_eq!(
            status_of(module.build_router(), "/pages").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let (mut module, _) = module();
        let port = module.start().await.unwrap();
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let (module, _) = module();
        assert!(module.serve(std::future::ready(())).await.is_err());
    }

    #[tokio::test]
    async fn serve_returns_when_shutdown_resolves() {
        let (mut module, _) = module();
        module.start().await.unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(module.serve(async move {
            let _ = stop_rx.await;
        }));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
