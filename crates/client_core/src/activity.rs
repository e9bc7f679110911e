use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

/// "Request in progress" indicator shared by every dispatcher and updater of a
/// session. Overlapping requests are counted, so the flag stays raised until
/// the last one finishes.
#[derive(Clone)]
pub struct ActivityFlag {
    inner: Arc<ActivityInner>,
}

struct ActivityInner {
    in_flight: Mutex<usize>,
    tx: watch::Sender<bool>,
}

impl Default for ActivityFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityFlag {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ActivityInner {
                in_flight: Mutex::new(0),
                tx,
            }),
        }
    }

    pub fn begin(&self) -> ActivityToken {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *in_flight += 1;
        if *in_flight == 1 {
            self.inner.tx.send_replace(true);
        }
        ActivityToken {
            flag: self.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        *self.inner.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }

    fn end(&self) {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.inner.tx.send_replace(false);
        }
    }
}

/// Clears its share of the flag when dropped, whichever path the request took.
#[must_use]
pub struct ActivityToken {
    flag: ActivityFlag,
}

impl Drop for ActivityToken {
    fn drop(&mut self) {
        self.flag.end();
    }
}
