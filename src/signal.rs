#![forbid(unsafe_code)]

/*
 *     ______   __  __     __         ______     ______
 *    /\  == \ /\ \/\ \   /\ \       /\  ___\   /\  ___\
 *    \ \  _-/ \ \ \_\ \  \ \ \____  \ \___  \  \ \  __\
 *     \ \_\    \ \_____\  \ \_____\  \/\_____\  \ \_____\
 *      \/_/     \/_____/   \/_____/   \/_____/   \/_____/
 *
 * Author: Colin MacRitchie / Ripple Group
 */
/* Auto-reset wakeup primitive */
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Auto-reset event built from a flag and a condition variable.
///
/// `set` wakes at most one waiter and the flag is consumed by the waiter
/// that observes it, so a single pulse drains a single `wait`. Spurious
/// wakeups are absorbed internally; callers still re-check their queues
/// after a successful wait.
#[derive(Debug, Default)]
pub struct AutoResetEvent {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl AutoResetEvent {
    /// Creates an unsignaled event.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Signals the event, releasing one waiter.
    ///
    /// If no thread is waiting, the flag stays set and the next `wait`
    /// returns immediately. Repeated sets before a wait coalesce into one.
    pub fn set(&self) {
        let mut signaled = self.flag.lock();
        *signaled = true;
        drop(signaled);
        self.cond.notify_one();
    }

    /// Blocks until the event is signaled or `timeout` elapses.
    ///
    /// Returns `true` if the signal was consumed, `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.flag.lock();
        while !*signaled {
            if self.cond.wait_until(&mut signaled, deadline).timed_out() {
                break;
            }
        }

        if *signaled {
            *signaled = false;
            true
        } else {
            false
        }
    }

    /// Returns whether the event is currently signaled, without consuming it.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_before_wait() {
        let event = AutoResetEvent::new();
        event.set();
        assert!(event.wait(Duration::from_millis(0)));
        /* Flag was consumed */
        assert!(!event.is_set());
    }

    #[test]
    fn test_wait_timeout() {
        let event = AutoResetEvent::new();
        let start = Instant::now();
        assert!(!event.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_auto_reset_drains_single_wait() {
        let event = AutoResetEvent::new();
        event.set();
        event.set();
        assert!(event.wait(Duration::from_millis(0)));
        /* Coalesced: second wait sees no signal */
        assert!(!event.wait(Duration::from_millis(0)));
    }

    #[test]
    fn test_cross_thread_wakeup() {
        let event = Arc::new(AutoResetEvent::new());
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(10));
        event.set();
        assert!(waiter.join().unwrap());
    }
}
