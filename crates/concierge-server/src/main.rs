//! Reception kiosk server binary — wires settings, engine, and transport
//! together and serves until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use concierge_engine::{
    AnalyticsSink, CannedReplies, Coordinator, MemoryStore, NoopSink, Outbox, ReplyGenerator,
    WebhookSink,
};
use concierge_server::metrics;
use concierge_server::rpc::context::RpcContext;
use concierge_server::rpc::handlers::build_registry;
use concierge_server::server::ConciergeServer;
use concierge_server::settings::Settings;
use concierge_server::websocket::registry::ConnectionRegistry;

/// Reception kiosk coordination server.
#[derive(Parser, Debug)]
#[command(name = "concierge-server", about = "Reception kiosk coordination server")]
struct Cli {
    /// Path to the JSON settings file.
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.settings.as_deref()).context("failed to load settings")?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    info!(
        staff = settings.staff.len(),
        host = %settings.server.host,
        port = settings.server.port,
        "settings loaded"
    );

    let metrics_handle =
        metrics::install_recorder().context("failed to install metrics recorder")?;

    let connections = Arc::new(ConnectionRegistry::new());
    let analytics: Arc<dyn AnalyticsSink> = match &settings.analytics.webhook_url {
        Some(url) => {
            info!(url = %url, "analytics webhook enabled");
            Arc::new(WebhookSink::new(url.clone()))
        }
        None => Arc::new(NoopSink),
    };
    let coordinator = Arc::new(Coordinator::new(
        settings.directory(),
        Arc::clone(&connections) as Arc<dyn Outbox>,
        Arc::new(MemoryStore::new()),
        analytics,
    ));
    let assistant: Arc<dyn ReplyGenerator> = Arc::new(CannedReplies::new(
        settings.assistant.fallback_replies.clone(),
    ));
    let ctx = Arc::new(RpcContext::new(
        coordinator,
        Arc::clone(&connections),
        assistant,
        settings.credentials(),
    ));

    let server =
        ConciergeServer::new(settings, ctx, build_registry()).with_metrics(metrics_handle);

    let shutdown = Arc::clone(server.shutdown());
    let signal_token = server.shutdown().token();
    let signal_task = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                shutdown.shutdown();
            }
            () = signal_token.cancelled() => {}
        }
    });

    server.run().await.context("server error")?;
    server
        .shutdown()
        .graceful_shutdown(vec![signal_task], Some(Duration::from_secs(5)))
        .await;
    info!("server stopped");
    Ok(())
}
