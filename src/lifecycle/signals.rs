//! OS signal handling.

use super::shutdown::ShutdownListener;

/// Resolve on Ctrl+C or when `listener` observes a shutdown.
pub async fn shutdown_signal(mut listener: ShutdownListener) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                // keep serving until told otherwise
                listener.wait().await;
            }
        },
        () = listener.wait() => tracing::info!("Shutdown requested"),
    }
}
