// src/engine/signal.rs

//! The two primitives the event worker and the supervisor worker share.
//!
//! - [`rebuild_signal`]: a capacity-one mailbox. Any number of writers may
//!   poke it; while a notification is pending further pokes are dropped, so
//!   a burst of file edits collapses into one rebuild.
//! - [`shutdown_token`]: a one-shot broadcast. Firing is idempotent and every
//!   listener (including ones created after the fact) observes it.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

/// Create a connected rebuild sender/receiver pair.
pub fn rebuild_signal() -> (RebuildSender, RebuildReceiver) {
    let (tx, rx) = mpsc::channel::<()>(1);
    (RebuildSender { tx }, RebuildReceiver { rx })
}

/// Writing half of the rebuild signal.
#[derive(Debug, Clone)]
pub struct RebuildSender {
    tx: mpsc::Sender<()>,
}

impl RebuildSender {
    /// Record a pending rebuild without blocking.
    ///
    /// Returns `false` if one was already pending (the request coalesces into
    /// it) or the receiver is gone.
    pub fn try_notify(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Reading half of the rebuild signal. Single consumer.
#[derive(Debug)]
pub struct RebuildReceiver {
    rx: mpsc::Receiver<()>,
}

impl RebuildReceiver {
    /// Wait for a pending rebuild and drain it.
    ///
    /// Once every sender is gone no rebuild can ever arrive, so this pends
    /// forever instead of spinning; callers always race it against the
    /// shutdown token.
    pub async fn recv(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    /// Drain a pending rebuild if there is one.
    pub fn try_recv(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

/// Create a shutdown token and a first listener for it.
pub fn shutdown_token() -> (Shutdown, ShutdownListener) {
    let (tx, rx) = watch::channel(false);
    (Shutdown { tx: Arc::new(tx) }, ShutdownListener { rx })
}

/// Firing side of the shutdown token.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Fire the token. Returns `true` only for the call that actually fired
    /// it.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observing side of the shutdown token.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token has fired. A dropped [`Shutdown`] counts as
    /// fired: nobody is left to keep the session alive.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;
    use tokio::time::timeout;

    proptest! {
        #[test]
        fn any_burst_coalesces_into_one_pending_rebuild(writers in 1usize..64) {
            let (tx, mut rx) = rebuild_signal();
            let accepted = (0..writers).filter(|_| tx.clone().try_notify()).count();

            prop_assert_eq!(accepted, 1);
            prop_assert!(rx.try_recv());
            prop_assert!(!rx.try_recv());
        }
    }

    #[tokio::test]
    async fn recv_drains_exactly_one_and_slot_reopens() {
        let (tx, mut rx) = rebuild_signal();
        assert!(tx.try_notify());
        assert!(!tx.try_notify());

        timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(!rx.try_recv());

        assert!(tx.try_notify());
        assert!(rx.try_recv());
    }

    #[tokio::test]
    async fn recv_pends_after_all_senders_dropped() {
        let (tx, mut rx) = rebuild_signal();
        drop(tx);

        let res = timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(res.is_err(), "closed signal must not resolve");
    }

    #[tokio::test]
    async fn shutdown_fires_once_and_reaches_late_listeners() {
        let (shutdown, mut early) = shutdown_token();
        assert!(!early.is_triggered());

        assert!(shutdown.fire());
        assert!(!shutdown.fire());
        assert!(shutdown.is_fired());

        let mut late = shutdown.subscribe();
        timeout(Duration::from_secs(1), early.wait()).await.unwrap();
        timeout(Duration::from_secs(1), late.wait()).await.unwrap();
        assert!(late.is_triggered());
    }

    #[tokio::test]
    async fn dropped_shutdown_releases_waiters() {
        let (shutdown, mut listener) = shutdown_token();
        drop(shutdown);

        timeout(Duration::from_secs(1), listener.wait()).await.unwrap();
    }
}
