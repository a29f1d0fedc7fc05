use std::time::Duration;

use tokio::sync::watch;

/// Cooperative cancellation shared between a controller and the work it controls.
///
/// Clones observe the same state. A [child](CancellationToken::child) is cancelled with its
/// parent but can also be cancelled on its own.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: watch::Sender<bool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        CancellationToken { sender }
    }

    /// A token that is already cancelled
    pub fn cancelled_token() -> Self {
        let token = Self::new();
        token.cancel();
        token
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // Only fails if the sender is gone, which cannot happen while `self` is alive
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// A token cancelled together with this one. Must be called within a tokio runtime.
    pub fn child(&self) -> CancellationToken {
        let child = CancellationToken::new();
        if self.is_cancelled() {
            child.cancel();
            return child;
        }

        let parent = self.clone();
        let linked = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = parent.cancelled() => linked.cancel(),
                _ = linked.cancelled() => {}
            }
        });
        child
    }

    /// A child token that also cancels itself after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> CancellationToken {
        let child = self.child();
        let timed = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    tracing::debug!("Cancellation timeout of {:?} elapsed", timeout);
                    timed.cancel();
                }
                _ = timed.cancelled() => {}
            }
        });
        child
    }
}
