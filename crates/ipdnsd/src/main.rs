// # ipdnsd - ipdns HTTP daemon
//
// The ipdnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime and logging
// 3. Registering record stores and creating the configured one
// 4. Serving the update and address endpoints until SIGTERM/SIGINT
//
// All update logic lives in ipdns-core; the handlers only translate HTTP.
//
// ## Configuration
//
// ### Client identity
// - `IPDNS_CLIENT_ID`: Client id accepted in Basic credentials
// - `IPDNS_SECRET`: Secret accepted in Basic credentials
//
// ### Server
// - `IPDNS_LISTEN_ADDR`: Bind address (default `0.0.0.0:8080`)
//
// ### Record store
// - `IPDNS_STORE_TYPE`: azure, file or memory (default azure)
// - `IPDNS_STORE_PATH`: Path to the records file (for file)
// - `IPDNS_ZONES`: Comma-separated zones (for file and memory)
// - `IPDNS_AZURE_TENANT_ID`, `IPDNS_AZURE_SUBSCRIPTION_ID`,
//   `IPDNS_AZURE_RESOURCE_GROUP`, `IPDNS_AZURE_CLIENT_ID`,
//   `IPDNS_AZURE_CLIENT_SECRET`: Service principal and DNS zone location (for azure)
// - `IPDNS_MODE=dry-run`: Log Azure writes instead of sending them
//
// ### Engine
// - `IPDNS_DEFAULT_TTL`: TTL for newly created record sets (default 3600)
// - `IPDNS_CLAIM_UNOWNED`: Whether untagged record sets may be claimed (default true)
//
// ## Example
//
// ```bash
// export IPDNS_CLIENT_ID=router
// export IPDNS_SECRET=s3cr3t-from-vault
// export IPDNS_STORE_TYPE=file
// export IPDNS_STORE_PATH=/var/lib/ipdns/records.json
// export IPDNS_ZONES=example.com
//
// ipdnsd
// ```

mod address;
mod config;
mod routes;

use anyhow::Result;
use config::Config;
use ipdns_core::{EngineEvent, StoreRegistry, UpdateEngine};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Target for the per-request audit trail
const AUDIT_TARGET: &str = "ipdns::audit";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IpdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<IpdnsExitCode> for ExitCode {
    fn from(code: IpdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IpdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IpdnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpdnsExitCode::ConfigError.into();
    }

    info!("Starting ipdnsd daemon");
    info!(
        "Configuration loaded: client '{}', {} store",
        config.client_id, config.store_type
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => IpdnsExitCode::CleanShutdown,
            Err(DaemonError::Startup(e)) => {
                error!("Startup failed: {:#}", e);
                IpdnsExitCode::ConfigError
            }
            Err(DaemonError::Runtime(e)) => {
                error!("Daemon error: {:#}", e);
                IpdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Whether the daemon failed before or after it started serving
enum DaemonError {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: Config) -> std::result::Result<(), DaemonError> {
    let registry = StoreRegistry::with_builtin_stores();

    #[cfg(feature = "azure")]
    {
        info!("Registering Azure DNS record store");
        ipdns_store_azure::register(&registry);
    }

    info!("Available record stores: {}", registry.list_stores().join(", "));

    let gateway = config.to_gateway_config();
    let store = registry
        .create_store(&gateway.store)
        .await
        .map_err(|e| DaemonError::Startup(e.into()))?;
    info!("Using {} record store", store.store_name());

    let (engine, events) =
        UpdateEngine::new(store, gateway).map_err(|e| DaemonError::Startup(e.into()))?;
    tokio::spawn(audit_events(events));

    // Signals are installed before the listener accepts anything
    let shutdown = shutdown_signal().map_err(DaemonError::Startup)?;

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            DaemonError::Startup(anyhow::anyhow!(
                "Failed to bind {}: {}",
                config.listen_addr,
                e
            ))
        })?;
    info!("Listening on {}", config.listen_addr);

    let app = routes::router(routes::AppState {
        engine: Arc::new(engine),
    });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let signal = shutdown.await;
        info!("Received shutdown signal: {}", signal);
        info!("Draining in-flight requests");
    })
    .await
    .map_err(|e| DaemonError::Runtime(e.into()))?;

    info!("Daemon stopped");
    Ok(())
}

/// Log every engine event as the audit trail
async fn audit_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::UpdateAccepted {
                domain,
                client_id,
                families,
            } => {
                info!(target: AUDIT_TARGET, "'{}' accepted for {} ({:?})", client_id, domain, families);
            }
            EngineEvent::UpdateRejected {
                domain,
                reason,
                detail,
            } => {
                warn!(
                    target: AUDIT_TARGET,
                    "Rejected update of {}: {} ({})",
                    domain.as_deref().unwrap_or("<none>"),
                    reason,
                    detail
                );
            }
            EngineEvent::RecordSetWritten {
                key,
                client_id,
                address,
                action,
            } => {
                info!(target: AUDIT_TARGET, "{} -> {} by '{}' ({:?})", key, address, client_id, action);
            }
            EngineEvent::OwnershipConflict {
                key,
                requesting_client,
                current_owner,
            } => {
                warn!(
                    target: AUDIT_TARGET,
                    "'{}' denied on {} owned by {}",
                    requesting_client,
                    key,
                    current_owner.as_deref().unwrap_or("<none>")
                );
            }
            EngineEvent::StoreFailed { key, error } => {
                error!(target: AUDIT_TARGET, "Store failed for {}: {}", key, error);
            }
        }
    }
}

/// Future resolving to the name of the first shutdown signal received
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Future resolving on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}
