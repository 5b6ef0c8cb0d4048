//! Host-side shutdown helper
//!
//! The sink itself never installs signal handlers; the process that
//! embeds it owns the lifecycle. A host that wants entries flushed on
//! interrupt wires it up like this:
//!
//! ```ignore
//! spyglass::signals::wait_for_shutdown().await;
//! sink.stop().await; // final drain
//! ```

use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Resolve when the process receives SIGINT or SIGTERM (Ctrl+C on
/// non-unix platforms).
#[cfg(unix)]
pub async fn wait_for_shutdown() {
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("SIGTERM received, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl+C received, initiating graceful shutdown");
    }
}
