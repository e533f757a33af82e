//! Cross-subsystem task dispatch engine
//!
//! This crate provides the asynchronous task core of an HTTP/WebSocket
//! client library: a process-global coordinator that accepts submissions
//! from any thread, hands work to caller-owned worker threads partitioned
//! by subsystem, and routes completions back to the submitter's task
//! group. A time-critical thread marker lets APIs refuse to run on
//! threads the host reserves for latency-sensitive work.

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

//     ______   __  __     __         ______     ______
//    /\  == \ /\ \/\ \   /\ \       /\  ___\   /\  ___\
//    \ \  _-/ \ \ \_\ \  \ \ \____  \ \___  \  \ \  __\
//     \ \_\    \ \_____\  \ \_____\  \/\_____\  \ \_____\
//      \/_/     \/_____/   \/_____/   \/_____/   \/_____/
//
// Author: Colin MacRitchie / Ripple Group
// Task dispatch core

/// Shared-reference cache handed to host code, drained before shutdown
pub mod cache;
/// Completed queues keyed by (subsystem, group)
pub mod completed;
/// Time-critical thread marker
pub mod critical;
/// Engine composition and singleton lifecycle
pub mod engine;
/// Error surface
pub mod error;
/// Task lifecycle event bus
pub mod events;
/// HRESULT translation for host integrations
pub mod hresult;
/// Free-function façade over the singleton
pub mod ops;
/// Pending queues and the executing set
pub mod pending;
/// Handle registry owning all task records
pub mod registry;
/// Auto-reset wakeup primitive
pub mod signal;
/// Task records, ids, and callback types
pub mod task;

// Public API exports
pub use critical::{lock_time_critical, set_time_critical, verify_not_time_critical};
pub use engine::{acquire, initialize, shutdown, ClientDefaults, Engine};
pub use error::EngineError;
pub use events::{EventBus, EventFn, SubscriptionHandle, TaskEvent};
pub use hresult::{from_hresult, to_hresult, HResult, ResultCode};
pub use ops::{
    close, drain_completed, drain_pending, mark_completed, submit, subscribe, unsubscribe,
    wait_for_completed, wait_for_pending, wait_for_task,
};
pub use registry::HandleRegistry;
pub use signal::AutoResetEvent;
pub use task::{
    GroupId, SubsystemId, Task, TaskId, TaskRequest, TaskState, Token, SUBSYSTEM_ID_GAME_MAX,
    SUBSYSTEM_ID_GAME_MIN,
};
