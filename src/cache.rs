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
/* Process-wide cache of shared references handed out to host code */
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);
static ENTRIES: Mutex<Option<HashMap<u64, Arc<dyn Any + Send + Sync>>>> = Mutex::new(None);

/// Parks a shared reference so host code can hold it by token instead of
/// by value. Returns the token used with [`remove`].
///
/// Shutdown calls [`cleanup`] before waiting for engine quiescence, so
/// anything parked here never blocks teardown.
pub fn store(value: Arc<dyn Any + Send + Sync>) -> u64 {
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    ENTRIES
        .lock()
        .get_or_insert_with(HashMap::new)
        .insert(token, value);
    token
}

/// Releases one cached reference. Unknown tokens return `None`.
pub fn remove(token: u64) -> Option<Arc<dyn Any + Send + Sync>> {
    ENTRIES.lock().as_mut()?.remove(&token)
}

/// Drops every cached reference.
///
/// Entries are moved out under the lock and dropped after it is
/// released, in case a drop re-enters the cache.
pub fn cleanup() {
    let drained = ENTRIES.lock().take();
    drop(drained);
}

#[cfg(test)]
mod tests {
    use super::*;

    /* The cache is process-global; serialize tests that touch it */
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_store_remove_roundtrip() {
        let _guard = TEST_LOCK.lock();
        let value: Arc<dyn Any + Send + Sync> = Arc::new(17u32);
        let token = store(Arc::clone(&value));

        let recovered = remove(token).unwrap();
        assert_eq!(*recovered.downcast::<u32>().unwrap(), 17);
        assert!(remove(token).is_none());
    }

    #[test]
    fn test_cleanup_drops_references() {
        let _guard = TEST_LOCK.lock();
        let value = Arc::new(5u8);
        let token = store(value.clone());
        assert_eq!(Arc::strong_count(&value), 2);

        cleanup();
        assert_eq!(Arc::strong_count(&value), 1);
        assert!(remove(token).is_none());
    }
}
