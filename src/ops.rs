//     ______   __  __     __         ______     ______
//    /\  == \ /\ \/\ \   /\ \       /\  ___\   /\  ___\
//    \ \  _-/ \ \ \_\ \  \ \ \____  \ \___  \  \ \  __\
//     \ \_\    \ \_____\  \ \_____\  \/\_____\  \ \_____\
//      \/_/     \/_____/   \/_____/   \/_____/   \/_____/
//
// Author: Colin MacRitchie / Ripple Group
//! Free-function façade over the engine singleton.
//!
//! Every operation acquires the current engine, performs its work, and
//! releases the reference before returning; none of them hold the
//! reference across a user callback boundary longer than the call
//! itself. Before `initialize` (and after `shutdown`) they all return
//! [`EngineError::NotInitialized`] and skip work.

use crate::engine::{self, Engine};
use crate::error::EngineError;
use crate::events::{EventFn, SubscriptionHandle};
use crate::task::{GroupId, SubsystemId, TaskId, TaskRequest, Token};
use std::sync::Arc;
use std::time::Duration;

fn current_engine() -> Result<Arc<Engine>, EngineError> {
    engine::acquire(false).ok_or(EngineError::NotInitialized)
}

/// Submits a task for execution on `request.subsystem_id`'s workers.
///
/// The returned id is the only reference the caller needs; pass it to
/// [`close`] once the completion has been delivered.
///
/// # Errors
///
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn submit(request: TaskRequest) -> Result<TaskId, EngineError> {
    Ok(current_engine()?.submit(request))
}

/// Dequeues and executes one pending task for a subsystem on the
/// calling (worker) thread. `Ok(None)` means the queue was empty.
///
/// # Errors
///
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn drain_pending(subsystem_id: SubsystemId) -> Result<Option<TaskId>, EngineError> {
    Ok(current_engine()?.drain_pending(subsystem_id))
}

/// Dequeues one completed task for `(subsystem_id, group_id)` and
/// delivers its results on the calling (completion) thread.
///
/// # Errors
///
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn drain_completed(
    subsystem_id: SubsystemId,
    group_id: GroupId,
) -> Result<Option<TaskId>, EngineError> {
    Ok(current_engine()?.drain_completed(subsystem_id, group_id))
}

/// Records completion of a task. Execute callbacks call this exactly
/// once, from any thread, when their work is done or has failed.
///
/// # Errors
///
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn mark_completed(id: TaskId) -> Result<(), EngineError> {
    current_engine()?.mark_completed(id);
    Ok(())
}

/// Releases the engine's ownership of a task record.
///
/// # Errors
///
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn close(id: TaskId) -> Result<(), EngineError> {
    current_engine()?.close(id);
    Ok(())
}

/// Registers a task-event callback for one subsystem.
///
/// # Errors
///
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn subscribe(
    subsystem_id: SubsystemId,
    callback: EventFn,
    context: Token,
) -> Result<SubscriptionHandle, EngineError> {
    Ok(current_engine()?.subscribe(subsystem_id, callback, context))
}

/// Removes a task-event subscription.
///
/// # Errors
///
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn unsubscribe(handle: SubscriptionHandle) -> Result<(), EngineError> {
    current_engine()?.unsubscribe(handle);
    Ok(())
}

/// Blocks the calling worker until pending work may be available.
///
/// # Errors
///
/// [`EngineError::WouldBlock`] on timeout,
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn wait_for_pending(timeout: Duration) -> Result<(), EngineError> {
    current_engine()?.wait_for_pending(timeout)
}

/// Blocks the calling completion thread until the group may have a
/// completion to drain.
///
/// # Errors
///
/// [`EngineError::WouldBlock`] on timeout,
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn wait_for_completed(
    subsystem_id: SubsystemId,
    group_id: GroupId,
    timeout: Duration,
) -> Result<(), EngineError> {
    current_engine()?.wait_for_completed(subsystem_id, group_id, timeout)
}

/// Blocks until one task completes, for synchronous waiters.
///
/// # Errors
///
/// [`EngineError::WouldBlock`] on timeout,
/// [`EngineError::NotInitialized`] if no engine exists.
pub fn wait_for_task(id: TaskId, timeout: Duration) -> Result<(), EngineError> {
    current_engine()?.wait_for_task(id, timeout)
}
