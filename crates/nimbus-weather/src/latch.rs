//! One-shot gate: settled once, then every waiter passes straight through.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Latch {
    tx: watch::Sender<bool>,
}

impl Latch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Open the gate. Later calls are no-ops.
    pub fn settle(&self) {
        self.tx.send_if_modified(|settled| {
            if *settled {
                false
            } else {
                *settled = true;
                true
            }
        });
    }

    pub fn is_settled(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|settled| *settled).await;
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}
