//! OS signal handling for graceful shutdown

use dmon_app::CancelToken;
use dmon_core::prelude::*;

/// Spawn a task that cancels `cancel` on SIGINT/SIGTERM (Ctrl-C on Windows).
pub fn spawn_signal_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = wait_for_signal() => {
                if let Err(e) = result {
                    error!("Signal handler error: {}", e);
                    return;
                }
                info!("Shutdown signal received");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });
}

/// Wait for a termination signal
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
        Ok(())
    }
}
