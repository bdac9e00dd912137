//! Request guard server.
//!
//! ```text
//!   plain :8080 ──┐                  ┌── /health (unguarded)
//!                 ├── trace / id ────┤
//!   tls   :8443 ──┘                  └── guard ── HTTPS → CSRF → rate limit ── handlers
//!
//!   admin :8081 (bearer)      sweeper (expired windows, idle sessions)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_guard::config::load_or_default;
use request_guard::lifecycle::signals::shutdown_on_signal;
use request_guard::observability::{logging, metrics};
use request_guard::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "request-guard", version)]
#[command(about = "HTTPS, CSRF and rate-limit guard for web requests", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    if cli.check {
        println!("Configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("request-guard v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        https_enforced = config.https.enforce,
        csrf_enabled = config.csrf.enabled,
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );
    tracing::info!(
        driver = %config.database.driver,
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.database,
        "Database settings"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
