//     ______   __  __     __         ______     ______
//    /\  == \ /\ \/\ \   /\ \       /\  ___\   /\  ___\
//    \ \  _-/ \ \ \_\ \  \ \ \____  \ \___  \  \ \  __\
//     \ \_\    \ \_____\  \ \_____\  \/\_____\  \ \_____\
//      \/_/     \/_____/   \/_____/   \/_____/   \/_____/
//
// Author: Colin MacRitchie / Ripple Group
// Singleton lifecycle: initialize, acquire, shutdown quiescence

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use task_pulse::{
    acquire, cache, drain_pending, initialize, shutdown, submit, wait_for_pending, EngineError,
    GroupId, SubsystemId, TaskRequest,
};

/* The engine is process-global; every test serializes on this */
static ENGINE_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_initialize_is_idempotent() {
    let _guard = ENGINE_LOCK.lock();

    initialize().unwrap();
    let first = acquire(false).unwrap();
    initialize().unwrap();
    let second = acquire(false).unwrap();

    /* Second call was a no-op; both references name the same engine */
    assert!(Arc::ptr_eq(&first, &second));

    drop(first);
    drop(second);
    shutdown();
    assert!(acquire(false).is_none());
}

#[test]
fn test_concurrent_initialize_single_winner() {
    let _guard = ENGINE_LOCK.lock();

    let racers: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| initialize().map(|()| acquire(false).unwrap())))
        .collect();

    let engines: Vec<_> = racers
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    for engine in &engines[1..] {
        assert!(Arc::ptr_eq(&engines[0], engine));
    }

    drop(engines);
    shutdown();
}

#[test]
fn test_ops_before_initialize_return_not_initialized() {
    let _guard = ENGINE_LOCK.lock();
    shutdown();

    assert!(acquire(false).is_none());
    assert_eq!(
        submit(TaskRequest::new(
            SubsystemId(1),
            GroupId(0),
            Box::new(|_, _| {}),
            Box::new(|_, _, _, _| {}),
        )),
        Err(EngineError::NotInitialized)
    );
    assert_eq!(
        drain_pending(SubsystemId(1)),
        Err(EngineError::NotInitialized)
    );
    assert_eq!(
        wait_for_pending(Duration::from_millis(1)),
        Err(EngineError::NotInitialized)
    );
}

#[test]
fn test_shutdown_without_initialize_is_noop() {
    let _guard = ENGINE_LOCK.lock();
    shutdown();
    shutdown();
    assert!(acquire(false).is_none());
}

#[test]
fn test_shutdown_waits_for_outstanding_references() {
    let _guard = ENGINE_LOCK.lock();
    initialize().unwrap();

    let held = acquire(false).unwrap();
    let holder = thread::spawn(move || {
        thread::sleep(Duration::from_millis(80));
        drop(held);
    });

    let start = Instant::now();
    shutdown();
    let waited = start.elapsed();

    holder.join().unwrap();
    assert!(
        waited >= Duration::from_millis(60),
        "shutdown returned while a reference was outstanding ({waited:?})"
    );
    assert!(acquire(false).is_none());
}

#[test]
fn test_shutdown_drains_shared_cache() {
    let _guard = ENGINE_LOCK.lock();
    initialize().unwrap();

    /* A collaborator parks its engine reference in the cache; shutdown
     * must drop it rather than deadlocking on its own strong count */
    let token = cache::store(acquire(false).unwrap());

    let start = Instant::now();
    shutdown();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(cache::remove(token).is_none());
    assert!(acquire(false).is_none());
}

#[test]
fn test_reinitialize_after_shutdown() {
    let _guard = ENGINE_LOCK.lock();

    initialize().unwrap();
    shutdown();
    initialize().unwrap();

    let engine = acquire(true).unwrap();
    assert_eq!(engine.live_tasks(), 0);

    drop(engine);
    shutdown();
}
