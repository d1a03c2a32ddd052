//! Cooperative shutdown signal.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable cancellation token backed by a `watch` channel.
///
/// Cancelling is one-way: once cancelled, every clone observes it.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signals shutdown to every clone of this token.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Resolves once [`Self::cancel`] has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as this token, so this only errors if
        // the channel is torn down, which also means shutdown.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
