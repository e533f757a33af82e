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
/* Engine singleton lifecycle and task routing */
use crate::cache;
use crate::completed::CompletedSet;
use crate::error::EngineError;
use crate::events::{EventBus, EventFn, SubscriptionHandle, TaskEvent};
use crate::pending::PendingSet;
use crate::registry::HandleRegistry;
use crate::task::{GroupId, SubsystemId, Task, TaskId, TaskRequest, TaskState, Token};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEFAULT_TIMEOUT_WINDOW: Duration = Duration::from_secs(20);
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/* Shutdown quiescence poll interval */
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Client-wide defaults carried on the singleton for cross-thread
/// discovery. The HTTP collaborator consumes them; the engine itself
/// never reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDefaults {
    /// Window across retries of one logical call.
    pub timeout_window: Duration,
    /// Per-request timeout.
    pub http_timeout: Duration,
    /// Delay between retries.
    pub retry_delay: Duration,
    /// Whether retries are attempted at all.
    pub retry_allowed: bool,
    /// Whether mock responses are consulted.
    pub mocks_enabled: bool,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            timeout_window: DEFAULT_TIMEOUT_WINDOW,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            retry_allowed: true,
            mocks_enabled: false,
        }
    }
}

/// The dispatch engine: a passive coordinator composed of the handle
/// registry, the pending/executing structures, the completed queues, and
/// the event bus. It owns no threads; callers supply workers, completion
/// drainers, and producers.
#[derive(Debug, Default)]
pub struct Engine {
    registry: HandleRegistry,
    pending: PendingSet,
    completed: CompletedSet,
    events: EventBus,
    defaults: RwLock<ClientDefaults>,
}

/* The singleton slot. Cold path only: initialize / acquire / shutdown.
 * No weak references to the engine exist anywhere, which is what keeps
 * the strong-count quiescence check in shutdown() valid. */
static ENGINE_SLOT: Mutex<Option<Arc<Engine>>> = Mutex::new(None);

/// Constructs the process-global engine if none exists.
///
/// Safe to race from multiple threads; exactly one construction wins and
/// the losers drop their instance without side effects. Idempotent once
/// a singleton is present.
///
/// # Errors
///
/// [`EngineError::OutOfMemory`] is reserved for allocation failure
/// during construction; on this toolchain allocation failure aborts, so
/// the call in practice always succeeds.
pub fn initialize() -> Result<(), EngineError> {
    let mut slot = ENGINE_SLOT.lock();
    if slot.is_none() {
        *slot = Some(Arc::new(Engine::new()));

        #[cfg(feature = "tracing")]
        tracing::info!("engine initialized");
    }
    Ok(())
}

/// Returns a shared reference to the singleton, or `None` before
/// `initialize` / after `shutdown`.
///
/// With `assert_if_null`, a missing singleton additionally emits an
/// error trace: calling engine APIs without initializing is a
/// programming error, not a recoverable condition.
#[must_use]
pub fn acquire(assert_if_null: bool) -> Option<Arc<Engine>> {
    let engine = ENGINE_SLOT.lock().clone();
    if assert_if_null && engine.is_none() {
        /* Programming error; trace and continue degraded */
        #[cfg(feature = "tracing")]
        tracing::error!("call initialize() first");
    }
    engine
}

/// Tears down the singleton and waits for quiescence.
///
/// The global reference is cleared first, so concurrent `acquire` calls
/// observe `None` immediately. The shared-reference cache is cleaned
/// once, then the call busy-polls the strong count at 10 ms until every
/// outstanding reference is released; the engine is destroyed on this
/// thread. A busy-poll is acceptable here because shutdown is rare and a
/// condition variable would have to be threaded through every callback
/// path.
pub fn shutdown() {
    let engine = ENGINE_SLOT.lock().take();

    if let Some(engine) = engine {
        cache::cleanup();

        while Arc::strong_count(&engine) > 1 {
            thread::sleep(SHUTDOWN_POLL);
        }

        #[cfg(feature = "tracing")]
        tracing::info!("engine shut down");
        drop(engine);
    }
}

impl Engine {
    fn new() -> Self {
        Self::default()
    }

    /// Allocates a task record for `request`, queues it pending, raises
    /// the PENDING event, and pulses the pending-ready signal.
    pub fn submit(&self, request: TaskRequest) -> TaskId {
        let id = self.registry.allocate_id();
        let task = Arc::new(Task::from_request(id, request));

        self.registry.store(Arc::clone(&task));
        self.pending.push(Arc::clone(&task));

        #[cfg(feature = "metrics")]
        metrics::counter!("task_pulse.submitted").increment(1);

        self.events.raise(task.subsystem_id, id, TaskEvent::Pending);
        self.pending.ready.set();
        id
    }

    /// Dequeues one pending task for `subsystem_id`, raises
    /// EXECUTE_STARTED, and runs its execute callback on the calling
    /// thread. Returns the task id, or `None` when the queue is empty.
    pub fn drain_pending(&self, subsystem_id: SubsystemId) -> Option<TaskId> {
        let task = self.pending.take_next(subsystem_id)?;

        if let Some((execute, context)) = task.take_execute() {
            self.events
                .raise(task.subsystem_id, task.id, TaskEvent::ExecuteStarted);
            execute(context, task.id);
        }

        Some(task.id)
    }

    /// Records completion of an executing task.
    ///
    /// Moves the task from the executing set to its group's completed
    /// queue, pulses the per-task and per-group signals, and raises
    /// EXECUTE_COMPLETED. Unknown ids and tasks missing from the
    /// executing set trace an error and return; the completion event is
    /// only raised when the move actually happened.
    pub fn mark_completed(&self, id: TaskId) {
        let Some(task) = self.registry.lookup(id) else {
            #[cfg(feature = "tracing")]
            tracing::error!(task_id = id.0, "mark_completed: unknown task id");
            return;
        };

        task.set_state(TaskState::Completed);

        if self.pending.finish_executing(id).is_none() {
            /* Double completion, or completion before drain; skip the
             * event rather than raising it for a task no queue holds */
            task.completed.set();
            return;
        }

        self.completed.push(Arc::clone(&task));
        task.completed.set();

        #[cfg(feature = "metrics")]
        metrics::counter!("task_pulse.completed").increment(1);

        self.events
            .raise(task.subsystem_id, task.id, TaskEvent::ExecuteCompleted);
    }

    /// Dequeues one completed task for `(subsystem_id, group_id)` and
    /// runs its write-results callback on the calling thread, forwarding
    /// the submitter's completion token pair.
    pub fn drain_completed(
        &self,
        subsystem_id: SubsystemId,
        group_id: GroupId,
    ) -> Option<TaskId> {
        let task = self.completed.pop(subsystem_id, group_id)?;

        if let Some((write_results, context, completion, completion_context)) =
            task.take_write_results()
        {
            write_results(context, task.id, completion, completion_context);
        }

        #[cfg(feature = "metrics")]
        metrics::counter!("task_pulse.results_delivered").increment(1);

        Some(task.id)
    }

    /// Releases the registry's ownership of a task record.
    pub fn close(&self, id: TaskId) {
        if self.registry.remove(id).is_none() {
            #[cfg(feature = "tracing")]
            tracing::error!(task_id = id.0, "close: unknown task id");
        }
    }

    /// Blocks until pending work may be available anywhere, or `timeout`.
    ///
    /// # Errors
    ///
    /// [`EngineError::WouldBlock`] on timeout; state is untouched.
    pub fn wait_for_pending(&self, timeout: Duration) -> Result<(), EngineError> {
        if self.pending.wait_ready(timeout) {
            Ok(())
        } else {
            Err(EngineError::WouldBlock)
        }
    }

    /// Blocks until a completion may be available for the group, or
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// [`EngineError::WouldBlock`] on timeout; state is untouched.
    pub fn wait_for_completed(
        &self,
        subsystem_id: SubsystemId,
        group_id: GroupId,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        if self.completed.wait_ready(subsystem_id, group_id, timeout) {
            Ok(())
        } else {
            Err(EngineError::WouldBlock)
        }
    }

    /// Blocks on one task's completed signal.
    ///
    /// # Errors
    ///
    /// [`EngineError::WouldBlock`] on timeout or for an id the registry
    /// no longer holds.
    pub fn wait_for_task(&self, id: TaskId, timeout: Duration) -> Result<(), EngineError> {
        let task = self.registry.lookup(id).ok_or(EngineError::WouldBlock)?;
        if task.state() == TaskState::Completed || task.completed.wait(timeout) {
            Ok(())
        } else {
            Err(EngineError::WouldBlock)
        }
    }

    /// Registers a task-event callback for one subsystem.
    pub fn subscribe(
        &self,
        subsystem_id: SubsystemId,
        callback: EventFn,
        context: Token,
    ) -> SubscriptionHandle {
        self.events.subscribe(subsystem_id, callback, context)
    }

    /// Removes a task-event subscription.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.events.unsubscribe(handle);
    }

    /// Snapshot of the client defaults.
    #[must_use]
    pub fn defaults(&self) -> ClientDefaults {
        self.defaults.read().clone()
    }

    /// Replaces the client defaults.
    pub fn set_defaults(&self, defaults: ClientDefaults) {
        *self.defaults.write() = defaults;
    }

    /// Live task-record count, for diagnostics.
    #[must_use]
    pub fn live_tasks(&self) -> usize {
        self.registry.len()
    }

    /// Executing-set size, for leak hunting.
    #[must_use]
    pub fn executing_tasks(&self) -> usize {
        self.pending.executing_len()
    }
}
