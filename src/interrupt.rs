use std::sync::Arc;
use tokio::sync::watch;

/// Process-wide cancellation for blocking topology calls.
///
/// Clones share state: interrupting one clone wakes every task waiting on
/// any of them. Once fired, the signal stays fired.
#[derive(Debug, Clone)]
pub struct InterruptSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn interrupt(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_interrupted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal has fired.
    pub async fn interrupted(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|fired| *fired).await.is_err() {
            // Sender is kept alive by `self`, so this only happens during teardown.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_interrupt_wakes_waiters() {
        let signal = InterruptSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.interrupted().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!signal.is_interrupted());
        signal.interrupt();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(signal.is_interrupted());
    }

    #[tokio::test]
    async fn test_already_fired_resolves_immediately() {
        let signal = InterruptSignal::new();
        signal.interrupt();
        tokio::time::timeout(Duration::from_millis(100), signal.interrupted())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unfired_signal_stays_pending() {
        let signal = InterruptSignal::new();
        let res = tokio::time::timeout(Duration::from_millis(20), signal.interrupted()).await;
        assert!(res.is_err());
    }
}
