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
/* Handle id allocation and id -> task record ownership */
use crate::task::{Task, TaskId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Owner of all task records, keyed by handle id.
///
/// The map's sharded locks are a concurrency domain of their own,
/// separate from the queue locks, so lookups stay off the hot queue
/// path. Queues hold `Arc` clones; the registry entry is what `close`
/// releases.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    last_id: AtomicU64,
    tasks: DashMap<TaskId, Arc<Task>>,
}

impl HandleRegistry {
    /// Creates an empty registry. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_id: AtomicU64::new(0),
            tasks: DashMap::new(),
        }
    }

    /// Returns the next handle id, strictly monotone per engine lifetime.
    pub fn allocate_id(&self) -> TaskId {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        if id == 0 {
            /* 64-bit wrap; unreachable at any real submission rate */
            #[cfg(feature = "tracing")]
            tracing::error!("task id counter wrapped");
        }
        TaskId(id)
    }

    /// Inserts an owning reference keyed by `task.id`.
    ///
    /// Returns `false` (and leaves the existing entry alone) if the id is
    /// already present, which indicates a broken id allocator.
    pub fn store(&self, task: Arc<Task>) -> bool {
        let id = task.id;
        let entry = self.tasks.entry(id);
        match entry {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                #[cfg(feature = "tracing")]
                tracing::error!(task_id = id.0, "duplicate task id in registry");
                false
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(task);
                true
            }
        }
    }

    /// Returns a shared reference to the record, or `None` for an unknown
    /// or already-closed id. Safe while other threads mutate the registry.
    #[must_use]
    pub fn lookup(&self, id: TaskId) -> Option<Arc<Task>> {
        self.tasks.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drops ownership of the record. The task is destroyed once the last
    /// queue or caller reference goes away.
    pub fn remove(&self, id: TaskId) -> Option<Arc<Task>> {
        self.tasks.remove(&id).map(|(_, task)| task)
    }

    /// Number of live records, for diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether any records remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
