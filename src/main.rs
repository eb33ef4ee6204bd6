//! Authority Dispatch Service
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────────┐
//!                      │                    AUTHORITY DISPATCH                     │
//!                      │                                                          │
//!   POST /documents    │  ┌─────────┐    ┌──────────┐    ┌──────────────┐        │
//!   ───────────────────┼─▶│  http   │───▶│ records  │───▶│  dispatcher  │        │
//!                      │  │ intake  │    │ (create) │    │ (semaphore)  │        │
//!                      │  └─────────┘    └──────────┘    └──────┬───────┘        │
//!                      │                                        ▼                 │
//!                      │  ┌──────────────┐   ┌────────────────────────────────┐  │
//!                      │  │ state manager│◀──│     workflow orchestrator      │  │
//!                      │  │ (CAS lock)   │   │ build → submit → interpret     │  │
//!                      │  └──────────────┘   └──────┬──────────────────┬──────┘  │
//!                      │                            ▼                  ▼         │
//!                      │                   ┌──────────────┐   ┌──────────────┐   │   Authority
//!                      │                   │  authority   │──▶│  envelope    │◀──┼── (SOAP)
//!                      │                   │  client      │   │  extractor   │   │
//!                      │                   └──────────────┘   └──────────────┘   │
//!                      │                            │                             │
//!                      │                            ▼                             │
//!                      │                   ┌──────────────┐                      │   Subscriber
//!                      │                   │ notification │──────────────────────┼──▶ (signed
//!                      │                   │ worker       │                      │    webhook)
//!                      │                   └──────────────┘                      │
//!                      │  ┌────────────────────────────────────────────────────┐ │
//!                      │  │              Cross-Cutting Concerns                 │ │
//!                      │  │  config · observability · resilience · lifecycle    │ │
//!                      │  └────────────────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use tokio::net::TcpListener;

use authority_dispatch::authority::SoapTransport;
use authority_dispatch::config::load_or_default;
use authority_dispatch::http::{AppState, HttpServer};
use authority_dispatch::lifecycle::{Services, Shutdown};
use authority_dispatch::notify::HttpNotificationTransport;
use authority_dispatch::observability::{logging, metrics};
use authority_dispatch::records::MemoryRecordStore;
use authority_dispatch::security::IssuerRateLimiter;

/// Time allowed for queued notifications after the server stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "authority-dispatch", version, about = "Resilient document submission service")]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(short, long, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("authority-dispatch v{} starting", env!("CARGO_PKG_VERSION"));

    if config.notification.secret == "default-secret" {
        tracing::warn!("Using the default notification secret; set CLIENT_WEBHOOK_SECRET");
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let authority_transport = Arc::new(SoapTransport::new(
        config.authority.soap_action.clone(),
        Duration::from_secs(config.authority.retry.retry_timeout_secs),
    )?);
    let notification_transport = Arc::new(HttpNotificationTransport::new(Duration::from_secs(
        config.notification.timeout_secs,
    ))?);

    let services = Services::build(
        &config,
        Arc::new(MemoryRecordStore::new()),
        authority_transport,
        notification_transport,
    );

    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let reclaim = tokio::spawn(services.reclaim.run(shutdown.subscribe()));

    let state = AppState {
        store: services.store,
        dispatcher: services.dispatcher,
        breakers: services.breakers,
        limiter: config
            .rate_limit
            .enabled
            .then(|| Arc::new(IssuerRateLimiter::from_config(&config.rate_limit))),
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(&config.server, state)
        .run(listener, shutdown.subscribe())
        .await?;

    if let Err(e) = reclaim.await {
        tracing::error!(error = %e, "Reclaim sweep task failed");
    }

    // The delivery worker exits once in-flight workflows drop their senders.
    match tokio::time::timeout(DRAIN_TIMEOUT, services.delivery).await {
        Ok(_) => tracing::info!("Notifications drained"),
        Err(_) => tracing::warn!("Timed out draining notifications"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
