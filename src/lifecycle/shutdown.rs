//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::watch;

/// Latched coordinator for graceful shutdown.
///
/// The flag stays set once triggered, so a listener that subscribes after
/// the signal watcher fired (a server still binding, a lookup task started
/// late) sees the shutdown immediately instead of waiting forever.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Set the flag. Repeated triggers are ignored.
    pub fn trigger(&self) {
        if self.tx.send_replace(true) {
            tracing::debug!("Shutdown already triggered");
            return;
        }
        tracing::info!(subscribers = self.tx.receiver_count(), "Shutdown triggered");
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One listener's view of a [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered, including before this call.
    pub async fn recv(&mut self) {
        // An error means every `Shutdown` handle is gone; nothing can
        // trigger any more, so treat it as shutdown.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        a.recv().await;
        b.recv().await;
        assert!(a.is_triggered());
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.recv())
            .await
            .expect("late subscriber must not wait");
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn untriggered_signal_stays_pending() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        assert!(tokio::time::timeout(Duration::from_millis(50), signal.recv())
            .await
            .is_err());
        assert!(!signal.is_triggered());
    }

    #[test]
    fn repeated_trigger_is_harmless() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }
}
