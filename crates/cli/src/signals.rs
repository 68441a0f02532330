#![forbid(unsafe_code)]

use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Termination signals that request a graceful shutdown.
#[derive(Debug)]
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    /// Install the handlers. Must happen before the watcher starts so an
    /// early signal is not lost.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next termination signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    /// Cancel `token` on the first termination signal.
    pub async fn cancel_on_signal(mut self, token: CancellationToken) {
        let name = self.recv().await;
        info!(signal = name, "received termination signal");
        token.cancel();
    }
}
