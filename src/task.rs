//     ______   __  __     __         ______     ______
//    /\  == \ /\ \/\ \   /\ \       /\  ___\   /\  ___\
//    \ \  _-/ \ \ \_\ \  \ \ \____  \ \___  \  \ \  __\
//     \ \_\    \ \_____\  \ \_____\  \/\_____\  \ \_____\
//      \/_/     \/_____/   \/_____/   \/_____/   \/_____/
//
// Author: Colin MacRitchie / Ripple Group
//! Task records and the callback types attached to them.

use crate::signal::AutoResetEvent;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Task identifier, unique and monotone for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Subsystem tag partitioning worker pools.
///
/// Callers reserve disjoint ranges; the engine does not validate and
/// simply creates queues lazily for whatever ids it sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubsystemId(pub u16);

/// Task group tag routing completions within a subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u64);

/// First subsystem id reserved for host-application use.
pub const SUBSYSTEM_ID_GAME_MIN: SubsystemId = SubsystemId(1);

/// Last subsystem id reserved for host-application use.
pub const SUBSYSTEM_ID_GAME_MAX: SubsystemId = SubsystemId(u16::MAX);

/// Opaque pointer-sized callback context.
///
/// The engine stores and forwards tokens untouched and never inspects
/// them. Hosts that drive the engine through a C surface put real
/// pointers here; pure-Rust callers usually leave them zero and let the
/// callback closures capture their state instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Token(pub usize);

/// Work function, called once on a worker thread.
///
/// Must eventually call `mark_completed` for its task id, exactly once,
/// from any thread.
pub type ExecuteFn = Box<dyn FnOnce(Token, TaskId) + Send>;

/// Result-delivery function, called once on the completion-draining
/// thread with the submitter's completion token pair forwarded verbatim.
pub type WriteResultsFn = Box<dyn FnOnce(Token, TaskId, Token, Token) + Send>;

/// Lifecycle state of a task. Transitions are monotone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Queued, waiting for a worker.
    Pending = 0,
    /// Between dequeue and completion.
    Executing = 1,
    /// Completion recorded, awaiting result delivery.
    Completed = 2,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Executing,
            _ => Self::Completed,
        }
    }
}

/// Everything a submitter supplies for one task.
pub struct TaskRequest {
    /// Subsystem whose workers execute the task.
    pub subsystem_id: SubsystemId,
    /// Group the completion is routed back to.
    pub group_id: GroupId,
    /// Work function.
    pub execute: ExecuteFn,
    /// Context forwarded to `execute`.
    pub execute_context: Token,
    /// Result-delivery function.
    pub write_results: WriteResultsFn,
    /// Context forwarded to `write_results`.
    pub write_results_context: Token,
    /// Opaque completion routine, forwarded to `write_results`.
    pub completion: Token,
    /// Opaque completion context, forwarded to `write_results`.
    pub completion_context: Token,
}

impl TaskRequest {
    /// Builds a request with zeroed context tokens.
    pub fn new(
        subsystem_id: SubsystemId,
        group_id: GroupId,
        execute: ExecuteFn,
        write_results: WriteResultsFn,
    ) -> Self {
        Self {
            subsystem_id,
            group_id,
            execute,
            execute_context: Token::default(),
            write_results,
            write_results_context: Token::default(),
            completion: Token::default(),
            completion_context: Token::default(),
        }
    }
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("subsystem_id", &self.subsystem_id)
            .field("group_id", &self.group_id)
            .finish_non_exhaustive()
    }
}

/// One submitted task.
///
/// Immutable after submission except for `state` and the once-only
/// callback slots. Ownership sits in the handle registry; queues hold
/// shared references.
pub struct Task {
    /// Stable identifier, the only reference exposed to host code.
    pub id: TaskId,
    /// Subsystem tag.
    pub subsystem_id: SubsystemId,
    /// Group tag.
    pub group_id: GroupId,

    state: AtomicU8,

    execute: Mutex<Option<ExecuteFn>>,
    execute_context: Token,
    write_results: Mutex<Option<WriteResultsFn>>,
    write_results_context: Token,
    completion: Token,
    completion_context: Token,

    /// Per-task wakeup for synchronous waiters, pulsed on completion.
    pub completed: AutoResetEvent,
}

impl Task {
    /// Builds the record for a request under a freshly allocated id.
    pub(crate) fn from_request(id: TaskId, request: TaskRequest) -> Self {
        Self {
            id,
            subsystem_id: request.subsystem_id,
            group_id: request.group_id,
            state: AtomicU8::new(TaskState::Pending as u8),
            execute: Mutex::new(Some(request.execute)),
            execute_context: request.execute_context,
            write_results: Mutex::new(Some(request.write_results)),
            write_results_context: request.write_results_context,
            completion: request.completion,
            completion_context: request.completion_context,
            completed: AutoResetEvent::new(),
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /* Single-writer: callers hold the relevant queue lock */
    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Takes the execute callback out of its slot.
    ///
    /// Returns `None` on the second and later calls, which structurally
    /// bounds execution at once per task.
    pub(crate) fn take_execute(&self) -> Option<(ExecuteFn, Token)> {
        self.execute
            .lock()
            .take()
            .map(|callback| (callback, self.execute_context))
    }

    /// Takes the write-results callback and the token set it is owed.
    pub(crate) fn take_write_results(&self) -> Option<(WriteResultsFn, Token, Token, Token)> {
        self.write_results.lock().take().map(|callback| {
            (
                callback,
                self.write_results_context,
                self.completion,
                self.completion_context,
            )
        })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("subsystem_id", &self.subsystem_id)
            .field("group_id", &self.group_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
