use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::widgets::BusyIndicator;

pub const DEFAULT_BUSY_DELAY: Duration = Duration::from_millis(500);

#[derive(Default)]
struct BusyState {
    done: bool,
    shown: bool,
}

/// Shows the busy indicator only when an operation outlives `delay`.
///
/// At most one indicator is shown per guard, and it is dismissed exactly once
/// when the guard finishes or is dropped.
pub struct BusyGuard {
    indicator: Arc<dyn BusyIndicator>,
    state: Arc<Mutex<BusyState>>,
    timer: JoinHandle<()>,
}

impl BusyGuard {
    pub fn arm(indicator: Arc<dyn BusyIndicator>, delay: Duration) -> Self {
        let state = Arc::new(Mutex::new(BusyState::default()));
        let timer = tokio::spawn({
            let indicator = Arc::clone(&indicator);
            let state = Arc::clone(&state);
            async move {
                tokio::time::sleep(delay).await;
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                if !state.done && !state.shown {
                    debug!(?delay, "operation still running, showing busy indicator");
                    state.shown = true;
                    indicator.show();
                }
            }
        });
        Self {
            indicator,
            state,
            timer,
        }
    }

    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.done {
            return;
        }
        state.done = true;
        self.timer.abort();
        if state.shown {
            self.indicator.dismiss();
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
#[path = "tests/busy_tests.rs"]
mod tests;
