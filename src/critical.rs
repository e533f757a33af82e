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
/* Time-critical thread marker */
use crate::error::EngineError;
use std::cell::Cell;

const CRITICAL_FALSE: u64 = 0x00;
const CRITICAL_TRUE: u64 = 0x01;
const CRITICAL_LOCKED: u64 = 0x02;

thread_local! {
    /* Const-initialized so the cell is usable before lazy TLS setup runs */
    static THREAD_STATE: Cell<u64> = const { Cell::new(CRITICAL_FALSE) };
}

/// Marks or unmarks the current thread as time critical.
///
/// APIs that must not run on latency-sensitive threads call
/// [`verify_not_time_critical`], which fails on a thread marked here.
///
/// # Errors
///
/// Returns [`EngineError::AccessDenied`] if the marker was locked with
/// [`lock_time_critical`] and `is_time_critical` differs from the locked
/// value. Re-asserting the locked value succeeds.
pub fn set_time_critical(is_time_critical: bool) -> Result<(), EngineError> {
    THREAD_STATE.with(|state| {
        let current = state.get();
        let mut value = if is_time_critical {
            CRITICAL_TRUE
        } else {
            CRITICAL_FALSE
        };

        if current & CRITICAL_LOCKED != 0 {
            value |= CRITICAL_LOCKED;
            if value != current {
                return Err(EngineError::AccessDenied);
            }
        }

        state.set(value);
        Ok(())
    })
}

/// Succeeds unless the current thread is marked time critical.
///
/// # Errors
///
/// Returns [`EngineError::TimeCriticalThread`] on a marked thread.
pub fn verify_not_time_critical() -> Result<(), EngineError> {
    if THREAD_STATE.with(Cell::get) & CRITICAL_TRUE == 0 {
        Ok(())
    } else {
        Err(EngineError::TimeCriticalThread)
    }
}

/// Freezes the time-critical state of the current thread.
///
/// Idempotent. Once locked, the state cannot change for the lifetime of
/// the thread; [`set_time_critical`] rejects any differing value with
/// `AccessDenied`. There is no unlock.
pub fn lock_time_critical() {
    THREAD_STATE.with(|state| state.set(state.get() | CRITICAL_LOCKED));
}
