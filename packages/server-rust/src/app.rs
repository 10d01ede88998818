//! Node assembly: storage, page store, bus and lifecycle wiring.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use wiki_core::{ClockSource, SystemClock};

use crate::network::{NetworkConfig, ShutdownController};
use crate::service::{
    MessageBus, OperationRouter, PageStoreProxy, PageStoreService, ServerConfig, ServiceContext,
    ServiceRegistry,
};
use crate::storage::{DatabaseConfig, SqlPageBackend};
use crate::traits::{PageBackend, PageStoreApi};

/// How long shutdown waits for in-flight requests before stopping the bus.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to start a node.
#[derive(Debug, Clone, Default)]
pub struct WikiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub network: NetworkConfig,
}

/// A running node: the page store bound on the bus, ready for requests.
pub struct WikiNode {
    config: Arc<ServerConfig>,
    registry: ServiceRegistry,
    bus: MessageBus,
    shutdown: Arc<ShutdownController>,
}

impl WikiNode {
    /// Connects to the configured database and starts the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the statements file cannot be loaded, the
    /// database is unreachable, or startup fails (see [`Self::start_with_backend`]).
    pub async fn start(config: &WikiConfig) -> anyhow::Result<Self> {
        let backend = SqlPageBackend::connect(&config.database).await?;
        Self::start_with_backend(config.server.clone(), Arc::new(backend), Arc::new(SystemClock))
            .await
    }

    /// Starts the node over an already connected backend.
    ///
    /// Creates the schema, binds the store at the bus address and probes it
    /// with a listing round trip. The node reports `Ready` only once that
    /// probe succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation or the readiness probe fails.
    /// The bus and the backend are shut down before returning.
    pub async fn start_with_backend(
        config: ServerConfig,
        backend: Arc<dyn PageBackend>,
        clock: Arc<dyn ClockSource>,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let registry = ServiceRegistry::new();
        let store = registry.register(PageStoreService::new(backend, clock));

        let ctx = ServiceContext {
            config: Arc::clone(&config),
        };
        if let Err(e) = registry.init_all(&ctx).await {
            let _ = registry.shutdown_all(true).await;
            return Err(e.context("page store failed to initialize"));
        }

        let mut router = OperationRouter::new();
        router.register(config.bus_address.clone(), store);

        let shutdown = Arc::new(ShutdownController::new());
        let bus = MessageBus::start(router, &config, Arc::clone(&shutdown));

        let mut node = Self {
            config,
            registry,
            bus,
            shutdown,
        };

        match node.proxy().list_pages().await {
            Ok(pages) => {
                node.shutdown.set_ready();
                info!(
                    address = %node.config.bus_address,
                    pages = pages.len(),
                    "page store ready"
                );
                Ok(node)
            }
            Err(failure) => {
                node.bus.stop().await;
                let _ = node.registry.shutdown_all(true).await;
                Err(anyhow::anyhow!("readiness probe failed: {failure}"))
            }
        }
    }

    /// A proxy to the page store bound on this node's bus.
    #[must_use]
    pub fn proxy(&self) -> PageStoreProxy {
        PageStoreProxy::new(self.bus.client(), self.config.bus_address.clone())
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Drains in-flight requests, stops the bus and releases storage.
    ///
    /// # Errors
    ///
    /// Returns the first service shutdown failure.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.shutdown.trigger_shutdown();
        if !self.shutdown.wait_for_drain(DRAIN_TIMEOUT).await {
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "drain timeout expired with requests still in flight"
            );
        }
        self.bus.stop().await;
        self.registry.shutdown_all(false).await?;
        info!("node stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use wiki_core::{FailureCode, Page, PageSummary};

    use super::*;
    use crate::network::HealthState;
    use crate::storage::{Statement, StorageError};
    use crate::test_support::{bare_sqlite_backend, sqlite_config};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn start_from_config_serves_requests() {
        let dir = tempfile::tempdir().unwrap();
        let config = WikiConfig {
            database: sqlite_config(&dir),
            ..WikiConfig::default()
        };

        let node = WikiNode::start(&config).await.unwrap();
        assert_eq!(node.shutdown_controller().health_state(), HealthState::Ready);

        let proxy = node.proxy();
        proxy.create_page("p1", "Home", at(1)).await.unwrap();
        assert_eq!(proxy.list_pages().await.unwrap().len(), 1);

        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn pages_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = WikiConfig {
            database: sqlite_config(&dir),
            ..WikiConfig::default()
        };

        let node = WikiNode::start(&config).await.unwrap();
        node.proxy().create_page("p1", "home", at(1)).await.unwrap();
        node.proxy().save_page("p1", "kept", at(2)).await.unwrap();
        node.shutdown().await.unwrap();

        let node = WikiNode::start(&config).await.unwrap();
        let page = node.proxy().get_page_by_id("p1").await.unwrap().unwrap();
        assert_eq!(page.content, "kept");
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn start_with_bare_backend_creates_schema() {
        let (backend, _dir) = bare_sqlite_backend().await;
        let node = WikiNode::start_with_backend(
            ServerConfig::default(),
            Arc::new(backend),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();

        assert!(node.proxy().list_pages().await.unwrap().is_empty());
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn custom_bus_address_is_used() {
        let (backend, _dir) = bare_sqlite_backend().await;
        let config = ServerConfig {
            bus_address: "pages.test".to_string(),
            ..ServerConfig::default()
        };
        let node = WikiNode::start_with_backend(config, Arc::new(backend), Arc::new(SystemClock))
            .await
            .unwrap();

        let proxy = node.proxy();
        assert_eq!(proxy.address(), "pages.test");
        assert!(proxy.list_pages().await.is_ok());
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unsupported_database_url_fails_to_start() {
        let config = WikiConfig {
            database: DatabaseConfig {
                url: "mysql://localhost/wiki".to_string(),
                ..DatabaseConfig::default()
            },
            ..WikiConfig::default()
        };
        assert!(WikiNode::start(&config).await.is_err());
    }

    /// Backend whose schema creation succeeds but whose listing always fails.
    struct BrokenListing;

    #[async_trait]
    impl PageBackend for BrokenListing {
        async fn initialize(&self) -> Result<(), StorageError> {
            Ok(())
        }
        async fn list_active(&self) -> Result<Vec<PageSummary>, StorageError> {
            Err(StorageError::new(Statement::AllPages, "disk on fire"))
        }
        async fn find_by_id(&self, _id: &str) -> Result<Option<Page>, StorageError> {
            Ok(None)
        }
        async fn find_by_name(&self, _name: &str) -> Result<Option<Page>, StorageError> {
            Ok(None)
        }
        async fn insert(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<(), StorageError> {
            Ok(())
        }
        async fn update_content(
            &self,
            _: &str,
            _: &str,
            _: DateTime<Utc>,
        ) -> Result<u64, StorageError> {
            Ok(0)
        }
        async fn mark_deleted(
            &self,
            _: &str,
            _: &str,
            _: DateTime<Utc>,
        ) -> Result<u64, StorageError> {
            Ok(0)
        }
        async fn close(&self) {}
    }

    #[tokio::test]
    async fn failed_readiness_probe_aborts_startup() {
        let result = WikiNode::start_with_backend(
            ServerConfig::default(),
            Arc::new(BrokenListing),
            Arc::new(SystemClock),
        )
        .await;

        let Err(err) = result else {
            panic!("startup should fail");
        };
        let message = err.to_string();
        assert!(message.contains("readiness probe failed"));
        assert!(message.contains("disk on fire"));
    }

    #[tokio::test]
    async fn shutdown_refuses_later_requests() {
        let (backend, _dir) = bare_sqlite_backend().await;
        let node = WikiNode::start_with_backend(
            ServerConfig::default(),
            Arc::new(backend),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();
        let proxy = node.proxy();
        let controller = node.shutdown_controller();

        node.shutdown().await.unwrap();

        assert_eq!(controller.health_state(), HealthState::Stopped);
        let failure = proxy.list_pages().await.unwrap_err();
        assert_eq!(failure.code, FailureCode::Transport);
    }
}
