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
/* Per-subsystem pending FIFOs and the executing set, one lock for both */
use crate::signal::AutoResetEvent;
use crate::task::{SubsystemId, Task, TaskId, TaskState};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct PendingInner {
    /* Queues are created lazily on first reference to a subsystem id */
    queues: HashMap<SubsystemId, VecDeque<Arc<Task>>>,
    /* Tasks between dequeue and completion, in dequeue order */
    executing: Vec<Arc<Task>>,
}

/// Pending work, partitioned by subsystem.
///
/// A single mutex covers the pending queues and the executing set so a
/// task's PENDING→EXECUTING transition is atomic with its queue hop.
/// FIFO holds within a subsystem; nothing is promised across subsystems.
#[derive(Debug, Default)]
pub struct PendingSet {
    inner: Mutex<PendingInner>,
    /// Engine-wide pending-ready signal, pulsed once per push.
    pub ready: AutoResetEvent,
}

impl PendingSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task to its subsystem's queue.
    ///
    /// The caller raises the PENDING event and pulses [`Self::ready`]
    /// afterwards, preserving "the event fires after the task is visible".
    pub fn push(&self, task: Arc<Task>) {
        task.set_state(TaskState::Pending);

        let mut inner = self.inner.lock();
        let queue = inner.queues.entry(task.subsystem_id).or_default();
        queue.push_back(Arc::clone(&task));

        #[cfg(feature = "tracing")]
        tracing::info!(
            queue_size = queue.len(),
            task_id = task.id.0,
            subsystem = task.subsystem_id.0,
            "task queued pending"
        );
    }

    /// Dequeues the subsystem's oldest pending task and moves it into the
    /// executing set, flipping its state to EXECUTING under the lock.
    ///
    /// Returns `None` without blocking when the queue is empty.
    pub fn take_next(&self, subsystem_id: SubsystemId) -> Option<Arc<Task>> {
        let mut inner = self.inner.lock();
        let task = inner.queues.get_mut(&subsystem_id)?.pop_front()?;

        task.set_state(TaskState::Executing);
        inner.executing.push(Arc::clone(&task));

        #[cfg(feature = "tracing")]
        tracing::info!(
            executing = inner.executing.len(),
            task_id = task.id.0,
            "task executing"
        );

        Some(task)
    }

    /// Removes a task from the executing set on completion.
    ///
    /// Returns `None` and traces an error when the id is not executing —
    /// a double completion or a completion for a task that never drained.
    /// The engine continues degraded in that case.
    pub fn finish_executing(&self, id: TaskId) -> Option<Arc<Task>> {
        let mut inner = self.inner.lock();
        let position = inner.executing.iter().position(|task| task.id == id);

        match position {
            Some(index) => Some(inner.executing.remove(index)),
            None => {
                #[cfg(feature = "tracing")]
                tracing::error!(task_id = id.0, "task not found in executing set");
                None
            }
        }
    }

    /// Blocks until the pending-ready signal fires or `timeout` elapses.
    ///
    /// Wakeups are advisory; callers re-check with [`Self::take_next`].
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        self.ready.wait(timeout)
    }

    /// Pending count for one subsystem, for diagnostics.
    #[must_use]
    pub fn pending_len(&self, subsystem_id: SubsystemId) -> usize {
        self.inner
            .lock()
            .queues
            .get(&subsystem_id)
            .map_or(0, VecDeque::len)
    }

    /// Size of the executing set, for diagnostics and leak hunting.
    #[must_use]
    pub fn executing_len(&self) -> usize {
        self.inner.lock().executing.len()
    }
}
