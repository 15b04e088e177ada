use std::{
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

/// Cloneable stop signal for the polling loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    shared: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wakeup) = &*self.shared;
        let mut cancelled = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *cancelled = true;
        wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.shared;
        *flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps for up to `timeout`, returning `true` as soon as the token is
    /// cancelled. A timeout too large to express as a deadline waits for
    /// cancellation alone.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, wakeup) = &*self.shared;
        let deadline = Instant::now().checked_add(timeout);
        let mut cancelled = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while !*cancelled {
            cancelled = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    match wakeup.wait_timeout(cancelled, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => wakeup
                    .wait(cancelled)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
            };
        }
        true
    }
}
