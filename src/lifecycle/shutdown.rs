//! Shutdown coordination for the server and its background tasks.
//!
//! The trigger is a latched flag, not a message: a task that starts
//! listening after shutdown began still sees it, and triggering twice is a
//! no-op.

use tokio::sync::watch;

/// Owner side of the shutdown flag.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Listener side, handed to each long-running task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Begin shutdown. Returns false if it had already begun.
    pub fn trigger(&self, reason: &str) -> bool {
        let first = self.tx.send_if_modified(|down| !std::mem::replace(down, true));
        if first {
            tracing::info!(reason, listeners = self.tx.receiver_count(), "Shutdown triggered");
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolve once shutdown begins, or when the coordinator is gone.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|down| *down).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}
