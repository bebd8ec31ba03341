//! Process-shared robust writer mutex.
//!
//! The mutex lives inside the mapped header, so it is initialized in place
//! with `PTHREAD_PROCESS_SHARED` and, on Linux, `PTHREAD_MUTEX_ROBUST`.
//! When a lock holder dies mid-mutation the next locker observes
//! `EOWNERDEAD`; we mark the mutex consistent and proceed; the generation
//! protocol re-synchronizes readers regardless of how much the dead writer
//! published.

use crate::error::{ShmError, ShmResult};
use std::marker::PhantomData;

/// Initializes a process-shared robust mutex in place.
///
/// # Safety
///
/// `mutex` must point to writable memory inside the mapping that no other
/// process is concurrently using as an initialized mutex.
pub(crate) unsafe fn init_in_place(mutex: *mut libc::pthread_mutex_t) -> ShmResult<()> {
    let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
    if libc::pthread_mutexattr_init(&mut attr) != 0 {
        return Err(ShmError::open_failed("pthread_mutexattr_init failed"));
    }
    libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED);
    #[cfg(target_os = "linux")]
    libc::pthread_mutexattr_setrobust(&mut attr, libc::PTHREAD_MUTEX_ROBUST);
    let rc = libc::pthread_mutex_init(mutex, &attr);
    libc::pthread_mutexattr_destroy(&mut attr);
    if rc != 0 {
        return Err(ShmError::open_failed("pthread_mutex_init failed"));
    }
    Ok(())
}

/// RAII guard for the writer mutex; unlocks on drop.
pub(crate) struct MutexGuard<'a> {
    mutex: *mut libc::pthread_mutex_t,
    _segment: PhantomData<&'a ()>,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: the guard was constructed from a successful lock on a
        // mutex that outlives it (it lives in the mapping).
        unsafe {
            libc::pthread_mutex_unlock(self.mutex);
        }
    }
}

/// Locks the writer mutex, healing `EOWNERDEAD` from a crashed holder.
///
/// # Safety
///
/// `mutex` must point to a mutex initialized by [`init_in_place`] inside a
/// mapping that outlives the returned guard.
pub(crate) unsafe fn lock<'a>(mutex: *mut libc::pthread_mutex_t) -> ShmResult<MutexGuard<'a>> {
    let rc = libc::pthread_mutex_lock(mutex);
    #[cfg(target_os = "linux")]
    if rc == libc::EOWNERDEAD {
        // The previous writer died holding the lock. Its mutation may be
        // partially published; readers detect that through the generation
        // counter once we bump it again.
        libc::pthread_mutex_consistent(mutex);
        return Ok(MutexGuard {
            mutex,
            _segment: PhantomData,
        });
    }
    if rc != 0 {
        return Err(ShmError::open_failed(format!(
            "pthread_mutex_lock failed: {rc}"
        )));
    }
    Ok(MutexGuard {
        mutex,
        _segment: PhantomData,
    })
}
