//! Delver Engine - Main entry point.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use delver_domain::{Namespaces, StyleRegistry, WidGenerator};
use delver_engine::api::{self, WsState};
use delver_engine::config::ServerConfig;
use delver_engine::infrastructure::{
    accounts::SqliteAccountStore, catalog::load_archetypes, clock::SystemClock,
};
use delver_engine::universe::Universe;
use delver_engine::world::WorldContext;

const USAGE: &str = "usage: delver-engine <host:port>";

/// Connections waiting to be picked up by the Universe.
const NEW_CLIENTS_BUFFER: usize = 64;

/// The single positional argument, if it looks like `host:port`.
fn listen_address() -> Option<String> {
    let mut args = std::env::args().skip(1);
    let (Some(address), None) = (args.next(), args.next()) else {
        return None;
    };
    let (host, port) = address.rsplit_once(':')?;
    (!host.is_empty() && port.parse::<u16>().is_ok()).then_some(address)
}

/// Creates a cancellation token and spawns a task that cancels it on SIGTERM/SIGINT
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}

fn load_dotenv_from_repo_root() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(address) = listen_address() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delver_engine=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Delver Engine");

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    let config = ServerConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Archetypes: {}", config.data_dir.display());
    tracing::info!("  Accounts: {}", config.accounts_db);
    tracing::info!(
        "  Worlds: tick {:?}, {} players",
        config.world.tick,
        config.world.max_players
    );

    let namespaces = Arc::new(Namespaces::default());
    let catalog = load_archetypes(&config.data_dir, &namespaces)
        .await
        .context("failed to load archetypes")?;
    tracing::info!(archetypes = catalog.len(), "Archetypes loaded");

    if let Some(parent) = Path::new(&config.accounts_db).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let accounts = SqliteAccountStore::new(&config.accounts_db)
        .await
        .context("failed to open the accounts store")?;

    let context = WorldContext {
        catalog: Arc::new(catalog),
        styles: Arc::new(StyleRegistry::with_defaults()),
        wids: Arc::new(WidGenerator::new()),
        clock: Arc::new(SystemClock::new()),
        config: config.world.clone(),
    };

    let (new_clients, arrivals) = mpsc::channel(NEW_CLIENTS_BUFFER);
    let check = Arc::new(Notify::new());
    let universe = Universe::new(Arc::new(accounts), namespaces, context, cancel_token.clone());
    let universe_task = tokio::spawn(universe.run(arrivals, check.clone()));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("Listening on {}", address);

    let state = Arc::new(WsState::new(new_clients, check));
    if let Err(e) = api::serve(listener, state, cancel_token.clone()).await {
        tracing::error!("Server error: {}", e);
        cancel_token.cancel();
    }

    tracing::info!("Waiting for worlds to stop...");
    if tokio::time::timeout(config.shutdown_timeout, async {
        let _ = universe_task.await;
    })
    .await
    .is_err()
    {
        tracing::warn!("Universe did not stop in time");
    }

    tracing::info!("Delver Engine shutdown complete");
    Ok(())
}
