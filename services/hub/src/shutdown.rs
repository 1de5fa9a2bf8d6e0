//! Graceful shutdown
//!
//! The sensing layer learns the hub is going away from a
//! `/serverDisconnected` message. OSC is fire-and-forget, so the process
//! lingers for a grace period to let the sender task flush it.

use crate::osc::OscPublisher;
use std::time::Duration;
use tracing::info;

/// Why the hub is stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Hangup,
    /// A core task ended or failed
    Fault(String),
}

/// Announce the shutdown over OSC and wait out the grace period.
pub async fn announce(osc: &OscPublisher, reason: &ShutdownReason, grace: Duration) {
    info!("Shutting down ({:?}), notifying openFrameworks", reason);
    osc.send_server_status(false);
    tokio::time::sleep(grace).await;
}

/// Resolves on Ctrl+C, or SIGHUP on unix.
pub async fn wait_for_signal() -> ShutdownReason {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::hangup()) {
            Ok(mut hangup) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => ShutdownReason::Interrupt,
                    _ = hangup.recv() => ShutdownReason::Hangup,
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGHUP: {}", e);
                interrupt().await
            }
        }
    }
    #[cfg(not(unix))]
    {
        interrupt().await
    }
}

async fn interrupt() -> ShutdownReason {
    match tokio::signal::ctrl_c().await {
        Ok(()) => ShutdownReason::Interrupt,
        Err(e) => ShutdownReason::Fault(format!("Ctrl+C handler failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ricochet_types::Address;

    #[tokio::test(start_paused = true)]
    async fn test_announce_sends_disconnect_then_waits() {
        let (osc, mut rx) = OscPublisher::channel();
        let started = tokio::time::Instant::now();

        announce(&osc, &ShutdownReason::Interrupt, Duration::from_millis(200)).await;

        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(rx.try_recv().unwrap().address, Address::ServerDisconnected);
    }
}
