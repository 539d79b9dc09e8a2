//! Signal handling for graceful shutdown

use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cancel `token` on Ctrl+C or, on Unix, SIGTERM
pub fn setup_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C signal: {}", e);
            return;
        }

        info!("Ctrl+C signal received");
        ctrl_c_token.cancel();
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM signal received");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

/// Wait for background work to wind down, giving up after `limit`
pub async fn graceful_shutdown<F>(work: F, limit: Duration)
where
    F: std::future::Future<Output = ()>,
{
    info!("Starting graceful shutdown...");
    match timeout(limit, work).await {
        Ok(()) => info!("Scheduled jobs stopped gracefully"),
        Err(_) => warn!(secs = limit.as_secs(), "Scheduled jobs did not stop within timeout"),
    }
}
