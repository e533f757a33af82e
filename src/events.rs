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
/* Task lifecycle event subscriptions */
use crate::task::{SubsystemId, TaskId, Token};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Task lifecycle event, delivered in-order per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// Task is visible in its subsystem's pending queue.
    Pending,
    /// A worker is about to run the execute callback.
    ExecuteStarted,
    /// Task is visible in its group's completed queue.
    ExecuteCompleted,
}

/// Subscription callback. Runs on the raising thread with no engine lock
/// held; must not re-enter submit, `mark_completed`, or `close` for the
/// same task.
pub type EventFn = Arc<dyn Fn(Token, TaskEvent, TaskId) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Subscription {
    subsystem_id: SubsystemId,
    callback: EventFn,
    context: Token,
}

/// Subscription list for task lifecycle telemetry.
///
/// The bus has its own lock, only ever taken alone: `raise` snapshots the
/// list under the lock, releases it, then invokes callbacks, so a
/// callback can subscribe or unsubscribe without deadlocking. The price
/// is that a change can miss the event raised immediately after it.
#[derive(Default)]
pub struct EventBus {
    next_handle: AtomicU64,
    subscriptions: Mutex<HashMap<u64, Subscription>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for one subsystem's task events.
    pub fn subscribe(
        &self,
        subsystem_id: SubsystemId,
        callback: EventFn,
        context: Token,
    ) -> SubscriptionHandle {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscriptions.lock().insert(
            handle,
            Subscription {
                subsystem_id,
                callback,
                context,
            },
        );
        SubscriptionHandle(handle)
    }

    /// Removes a subscription. Unknown handles are ignored.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.subscriptions.lock().remove(&handle.0);
    }

    /// Delivers `event` for a task to every subscriber of its subsystem.
    ///
    /// Best-effort: the snapshot is consistent, ordering against other
    /// producers is not.
    pub fn raise(&self, subsystem_id: SubsystemId, id: TaskId, event: TaskEvent) {
        let snapshot: Vec<(EventFn, Token)> = {
            let subscriptions = self.subscriptions.lock();
            subscriptions
                .values()
                .filter(|subscription| subscription.subsystem_id == subsystem_id)
                .map(|subscription| (Arc::clone(&subscription.callback), subscription.context))
                .collect()
        };

        for (callback, context) in snapshot {
            callback(context, event, id);
        }
    }

    /// Number of live subscriptions, for diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Whether any subscriptions exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> EventFn {
        let counter = Arc::clone(counter);
        Arc::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
    }

    #[test]
    fn test_raise_matches_subsystem() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.subscribe(SubsystemId(7), counting_callback(&hits), Token(0));

        bus.raise(SubsystemId(7), TaskId(1), TaskEvent::Pending);
        bus.raise(SubsystemId(8), TaskId(2), TaskEvent::Pending);

        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = bus.subscribe(SubsystemId(1), counting_callback(&hits), Token(0));

        bus.raise(SubsystemId(1), TaskId(1), TaskEvent::Pending);
        bus.unsubscribe(handle);
        bus.raise(SubsystemId(1), TaskId(1), TaskEvent::ExecuteStarted);

        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_callback_receives_context_and_event() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(
            SubsystemId(2),
            Arc::new(move |context, event, id| {
                sink.lock().push((context, event, id));
            }),
            Token(0xC0),
        );

        bus.raise(SubsystemId(2), TaskId(42), TaskEvent::ExecuteCompleted);

        let events = seen.lock();
        assert_eq!(
            events.as_slice(),
            &[(Token(0xC0), TaskEvent::ExecuteCompleted, TaskId(42))]
        );
    }

    #[test]
    fn test_callback_may_mutate_subscriptions() {
        let bus = Arc::new(EventBus::new());
        let bus_in_callback = Arc::clone(&bus);
        let handle = Arc::new(Mutex::new(None::<SubscriptionHandle>));
        let handle_in_callback = Arc::clone(&handle);

        let registered = bus.subscribe(
            SubsystemId(3),
            Arc::new(move |_, _, _| {
                /* Snapshot-then-invoke means this does not deadlock */
                if let Some(handle) = handle_in_callback.lock().take() {
                    bus_in_callback.unsubscribe(handle);
                }
            }),
            Token(0),
        );
        *handle.lock() = Some(registered);

        bus.raise(SubsystemId(3), TaskId(1), TaskEvent::Pending);
        assert!(bus.is_empty());
    }
}
