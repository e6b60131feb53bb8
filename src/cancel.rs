//! Cooperative cancellation for in-flight collection runs.
//!
//! A run is handed a [`CancelToken`]; the surrounding process keeps the
//! matching [`Canceller`] and fires it to abandon the run (the binary wires
//! it to Ctrl-C). Workers race their I/O against [`CancelToken::cancelled`],
//! so dropping the losing future aborts whatever network operation was in
//! flight.

use tokio::sync::watch;

/// Create a connected canceller/token pair for one run.
pub fn pair() -> (Canceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelToken { rx })
}

/// Fires cancellation for the tokens created alongside it.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Signal cancellation. Idempotent; a no-op once all tokens are gone.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observer half handed to the agent, its sources and the dispatcher.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never fire, for one-shot runs without an interrupt
    /// path.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is signalled.
    ///
    /// If the [`Canceller`] is dropped without firing, cancellation can no
    /// longer happen and this future stays pending forever; callers race
    /// it against real work with `tokio::select!`.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_flips_token() {
        let (canceller, token) = pair();
        assert!(!token.is_cancelled());

        canceller.cancel();
        assert!(token.is_cancelled());

        // cancelled() resolves immediately once fired
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("cancelled() should resolve after cancel()");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let (canceller, token) = pair();
        let waiter = tokio::spawn(async move { token.cancelled().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();

        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_never_token_stays_pending() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());

        let result = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(result.is_err(), "never() token must not resolve");
    }

    #[tokio::test]
    async fn test_dropped_canceller_means_never_cancelled() {
        let (canceller, token) = pair();
        drop(canceller);

        assert!(!token.is_cancelled());
        let result = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(result.is_err());
    }
}
