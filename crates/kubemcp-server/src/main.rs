use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{reload, EnvFilter, Registry};

use kubemcp_core::resolver::{self, ConfigOverlay, EnvVars};
use kubemcp_server::{ConnectionManager, KubeConnectBackend, KubeMcpHandler, RequestDispatcher};

/// Read-only Kubernetes access over the Model Context Protocol.
#[derive(Debug, Parser)]
#[command(name = "kubemcp", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Kubeconfig to authenticate with
    #[arg(long, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,

    /// Force read-only mode on, overriding every other source
    #[arg(long)]
    read_only: bool,

    /// Force debug logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Flags the operator did not pass set nothing, so lower-precedence
    /// sources keep their values.
    fn overlay(&self) -> ConfigOverlay {
        ConfigOverlay {
            kubeconfig_path: self.kubeconfig.clone(),
            read_only: self.read_only.then_some(true),
            log_level: self.debug.then(|| "debug".to_string()),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging has to exist before configuration resolves, or the resolver's
    // own warnings never reach a subscriber. Start from RUST_LOG (or the
    // --debug flag), then swap in the resolved level once it is known.
    let filter_handle = init_tracing(cli.debug);

    let config = resolver::resolve(
        &cli.overlay(),
        None,
        cli.config.as_deref(),
        &EnvVars::from_process(),
    )
    .context("resolving configuration")?;
    if std::env::var_os("RUST_LOG").is_none() {
        filter_handle
            .reload(EnvFilter::new(&config.log_level))
            .map_err(|err| anyhow::anyhow!("applying configured log level: {err}"))?;
    }

    let config = Arc::new(config);
    let connection = Arc::new(ConnectionManager::new(
        Arc::clone(&config),
        Arc::new(KubeConnectBackend::new()),
    ));
    let dispatcher = Arc::new(RequestDispatcher::new(Arc::clone(&config), connection));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        read_only = config.read_only,
        rbac_check = config.rbac_check,
        filter_sensitive_data = config.filter_sensitive_data,
        "kubemcp serving on stdio"
    );

    let service = KubeMcpHandler::new(dispatcher)
        .serve((stdin(), stdout()))
        .await
        .context("starting MCP server on stdio")?;
    service.waiting().await.context("serving MCP requests")?;
    Ok(())
}

/// Logs go to stderr; stdout belongs to the MCP transport. RUST_LOG wins
/// over the configured level when set.
fn init_tracing(debug: bool) -> reload::Handle<EnvFilter, Registry> {
    let initial = startup_filter(std::env::var("RUST_LOG").ok().as_deref(), debug);
    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// The filter in force while configuration is still resolving.
fn startup_filter(rust_log: Option<&str>, debug: bool) -> EnvFilter {
    match rust_log {
        Some(directives) => EnvFilter::new(directives),
        None if debug => EnvFilter::new("debug"),
        None => EnvFilter::new("info"),
    }
}
