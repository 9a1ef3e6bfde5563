// SPDX-License-Identifier: Apache-2.0
//! Standalone authoritative room server binary. Loads
//! [`tableforge_app_core::prefs::RoomServerPrefs`] through the
//! [`tableforge_app_core::config_port::ConfigPort`] seam, persisting
//! defaults on first run, then serves the [`tableforge_room_server::server`]
//! router until `Ctrl+C`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tableforge_app_core::config::ConfigService;
use tableforge_app_core::config_port::ConfigPort;
use tableforge_config_fs::FsConfigStore;
use tableforge_room_server::registry::RoomRegistryConfig;
use tableforge_room_server::server::{router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line overrides for [`RoomServerPrefs`]. Flags left unset fall
/// back to the saved (or default) preferences.
#[derive(Debug, Parser)]
#[command(author, version, about = "Authoritative multi-room game server")]
struct Args {
    /// TCP port to listen on.
    #[arg(long)]
    port: Option<u16>,
    /// Enable debug-level logging.
    #[arg(long)]
    verbose: bool,
    /// Maximum number of concurrently open rooms.
    #[arg(long)]
    max_rooms: Option<usize>,
    /// Seconds a disconnected seat may stay bound before it (and an
    /// emptied room) is released.
    #[arg(long, default_value_t = 30)]
    reconnect_grace_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigService::new(FsConfigStore::new().context("open config store")?);
    let mut prefs = config.load_prefs().unwrap_or_default();
    if let Some(port) = args.port {
        prefs.port = port;
    }
    if args.verbose {
        prefs.verbose = true;
    }
    if let Some(max_rooms) = args.max_rooms {
        prefs.max_rooms = max_rooms;
    }
    config.save_prefs(&prefs);

    let filter = if prefs.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(filter.parse()?))
        .init();

    let registry_config = RoomRegistryConfig { max_rooms: prefs.max_rooms, ..RoomRegistryConfig::default() };
    let state = AppState::new(registry_config, Duration::from_secs(args.reconnect_grace_secs));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], prefs.port));
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("bind {addr}"))?;
    info!(%addr, max_rooms = prefs.max_rooms, "tableforge-roomd listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler; shutting down anyway");
    }
}
