//! Wiki page store node: the store bound on the bus, plus health endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use wiki_server::network::{NetworkConfig, NetworkModule};
use wiki_server::service::ServerConfig;
use wiki_server::storage::DatabaseConfig;
use wiki_server::{WikiConfig, WikiNode};

#[derive(Debug, Parser)]
#[command(name = "wiki-server", version, about = "Wiki page store node")]
struct Cli {
    /// Database URL (`sqlite://...` or `postgres://...`).
    #[arg(long, env = "WIKI_DATABASE_URL", default_value = "sqlite://wiki.db?mode=rwc")]
    database_url: String,

    #[arg(long, env = "WIKI_MAX_POOL_SIZE", default_value_t = 30)]
    max_pool_size: u32,

    /// JSON file overriding the bundled SQL statements.
    #[arg(long, env = "WIKI_SQL_QUERIES_FILE")]
    sql_queries_file: Option<PathBuf>,

    /// Bus address the page store is bound to.
    #[arg(long, env = "WIKI_BUS_ADDRESS", default_value = "wikidb.queue")]
    bus_address: String,

    /// Transport timeout per request in milliseconds; 0 disables it.
    #[arg(long, env = "WIKI_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    request_timeout_ms: u64,

    #[arg(long, env = "WIKI_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port of the health endpoints.
    #[arg(long, env = "WIKI_PORT", default_value_t = 8080)]
    port: u16,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "WIKI_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "WIKI_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn wiki_config(&self) -> WikiConfig {
        WikiConfig {
            server: ServerConfig {
                bus_address: self.bus_address.clone(),
                default_operation_timeout_ms: self.request_timeout_ms,
                ..ServerConfig::default()
            },
            database: DatabaseConfig {
                url: self.database_url.clone(),
                max_pool_size: self.max_pool_size,
                sql_queries_file: self.sql_queries_file.clone(),
                ..DatabaseConfig::default()
            },
            network: NetworkConfig {
                host: self.host.clone(),
                port: self.port,
                ..NetworkConfig::default()
            },
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wiki_server=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Some(port) = cli.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "metrics exporter listening");
    }

    let config = cli.wiki_config();
    let node = WikiNode::start(&config).await?;

    let mut network = NetworkModule::new(
        config.network.clone(),
        node.shutdown_controller(),
        &config.server.bus_address,
    );
    let port = network.start().await?;
    info!(port, address = %config.server.bus_address, "wiki server running");

    network
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    node.shutdown().await
}
