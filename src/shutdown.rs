use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Process-wide one-shot shutdown request.
///
/// Any fatal failure signals it; the process driver observes it and tears
/// everything down. Signalling more than once is harmless.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        if !self.token.is_cancelled() {
            debug!("Shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been signalled.
    pub async fn requested(&self) {
        self.token.cancelled().await
    }
}
