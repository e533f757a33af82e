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
/* Completed FIFOs keyed by (subsystem, group), each with a ready signal */
use crate::signal::AutoResetEvent;
use crate::task::{GroupId, SubsystemId, Task};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct GroupQueue {
    queue: VecDeque<Arc<Task>>,
    ready: Arc<AutoResetEvent>,
}

/// Finished tasks awaiting result delivery, partitioned twice: by
/// subsystem, then by the submitter's task group.
///
/// Guarded by its own lock, independent from the pending lock, so a
/// completion-draining thread never serializes against workers pulling
/// new work. Group queues are created lazily on first reference.
#[derive(Debug, Default)]
pub struct CompletedSet {
    inner: Mutex<HashMap<SubsystemId, HashMap<GroupId, GroupQueue>>>,
}

impl CompletedSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task to its `(subsystem, group)` queue and pulses the
    /// group's ready signal. The task's own completed signal is pulsed by
    /// the engine, which also owns raising the completion event.
    pub fn push(&self, task: Arc<Task>) {
        let ready = {
            let mut inner = self.inner.lock();
            let group = inner
                .entry(task.subsystem_id)
                .or_default()
                .entry(task.group_id)
                .or_default();
            group.queue.push_back(Arc::clone(&task));

            #[cfg(feature = "tracing")]
            tracing::info!(
                queue_size = group.queue.len(),
                task_id = task.id.0,
                group = task.group_id.0,
                "task queued completed"
            );

            Arc::clone(&group.ready)
        };

        /* Pulse outside the lock; a waiter may run immediately */
        ready.set();
    }

    /// Dequeues the oldest completed task for the group, or `None`.
    pub fn pop(&self, subsystem_id: SubsystemId, group_id: GroupId) -> Option<Arc<Task>> {
        let mut inner = self.inner.lock();
        inner
            .get_mut(&subsystem_id)?
            .get_mut(&group_id)?
            .queue
            .pop_front()
    }

    /// Blocks on the group's ready signal, creating the group lazily so a
    /// drain thread can park before the first completion arrives.
    pub fn wait_ready(
        &self,
        subsystem_id: SubsystemId,
        group_id: GroupId,
        timeout: Duration,
    ) -> bool {
        self.ready_signal(subsystem_id, group_id).wait(timeout)
    }

    /// Completed count for one group, for diagnostics.
    #[must_use]
    pub fn len(&self, subsystem_id: SubsystemId, group_id: GroupId) -> usize {
        self.inner
            .lock()
            .get(&subsystem_id)
            .and_then(|groups| groups.get(&group_id))
            .map_or(0, |group| group.queue.len())
    }

    fn ready_signal(&self, subsystem_id: SubsystemId, group_id: GroupId) -> Arc<AutoResetEvent> {
        let mut inner = self.inner.lock();
        let group = inner
            .entry(subsystem_id)
            .or_default()
            .entry(group_id)
            .or_default();
        Arc::clone(&group.ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskId, TaskRequest};
    use std::thread;

    fn task(id: u64, subsystem: u16, group: u64) -> Arc<Task> {
        Arc::new(Task::from_request(
            TaskId(id),
            TaskRequest::new(
                SubsystemId(subsystem),
                GroupId(group),
                Box::new(|_, _| {}),
                Box::new(|_, _, _, _| {}),
            ),
        ))
    }

    #[test]
    fn test_fifo_per_group() {
        let completed = CompletedSet::new();
        completed.push(task(1, 1, 10));
        completed.push(task(2, 1, 10));

        assert_eq!(completed.pop(SubsystemId(1), GroupId(10)).unwrap().id, TaskId(1));
        assert_eq!(completed.pop(SubsystemId(1), GroupId(10)).unwrap().id, TaskId(2));
        assert!(completed.pop(SubsystemId(1), GroupId(10)).is_none());
    }

    #[test]
    fn test_groups_are_isolated() {
        let completed = CompletedSet::new();
        completed.push(task(1, 1, 10));
        completed.push(task(2, 1, 11));

        assert_eq!(completed.pop(SubsystemId(1), GroupId(11)).unwrap().id, TaskId(2));
        assert!(completed.pop(SubsystemId(1), GroupId(11)).is_none());
        assert_eq!(completed.pop(SubsystemId(1), GroupId(10)).unwrap().id, TaskId(1));
    }

    #[test]
    fn test_push_signals_waiting_group() {
        let completed = Arc::new(CompletedSet::new());
        let waiter = {
            let completed = Arc::clone(&completed);
            thread::spawn(move || {
                completed.wait_ready(SubsystemId(3), GroupId(9), Duration::from_secs(5))
            })
        };

        thread::sleep(Duration::from_millis(10));
        completed.push(task(7, 3, 9));
        assert!(waiter.join().unwrap());
        assert_eq!(completed.len(SubsystemId(3), GroupId(9)), 1);
    }

    #[test]
    fn test_pop_unknown_group() {
        let completed = CompletedSet::new();
        assert!(completed.pop(SubsystemId(8), GroupId(8)).is_none());
    }
}
