//! Best-effort auto-unlink of the first segment created by this process.
//!
//! Gated on the [`AUTO_CLEANUP_ENV`](crate::AUTO_CLEANUP_ENV) flag and
//! registered at most once per process: a normal-exit hook plus handlers
//! for the standard user-termination signals unlink the remembered segment
//! name exactly once. The handler path stays async-signal-safe: one
//! atomic swap and the `shm_unlink` syscall; the name lives in a fixed
//! static buffer written before registration.

use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

const NAME_CAP: usize = 256;

struct NameSlot(UnsafeCell<[u8; NAME_CAP]>);

// SAFETY: the slot is written once under REGISTRATION before ENABLED is
// set, and only read (by the exit paths) afterwards.
unsafe impl Sync for NameSlot {}

static NAME: NameSlot = NameSlot(UnsafeCell::new([0; NAME_CAP]));
static ENABLED: AtomicBool = AtomicBool::new(false);
static REGISTRATION: Mutex<bool> = Mutex::new(false);

fn store_name(name: &str) -> bool {
    // Reserve one byte for the NUL terminator.
    if name.is_empty() || name.len() >= NAME_CAP || name.as_bytes().contains(&0) {
        return false;
    }
    // SAFETY: serialized by the REGISTRATION lock held by the caller;
    // ENABLED is still false, so no exit path reads concurrently.
    unsafe {
        let buf = &mut *NAME.0.get();
        buf[..name.len()].copy_from_slice(name.as_bytes());
        buf[name.len()] = 0;
    }
    true
}

fn unlink_once() {
    if ENABLED.swap(false, SeqCst) {
        // SAFETY: the buffer holds a NUL-terminated name stored before
        // ENABLED was set; shm_unlink is async-signal-safe.
        unsafe {
            libc::shm_unlink(NAME.0.get().cast::<libc::c_char>());
        }
    }
}

extern "C" fn unlink_at_exit() {
    unlink_once();
}

extern "C" fn handle_signal(signum: libc::c_int) {
    unlink_once();
    // _exit, not exit: do not re-run the atexit hooks.
    unsafe {
        libc::_exit(128 + signum);
    }
}

/// Remembers `name` for unlink-on-exit and installs the hooks. Only the
/// first call per process has any effect.
pub(crate) fn register(name: &str) {
    let mut registered = REGISTRATION.lock();
    if *registered {
        return;
    }
    if !store_name(name) {
        return;
    }
    ENABLED.store(true, SeqCst);
    // SAFETY: the handlers are async-signal-safe and the atexit callback
    // only touches static state.
    unsafe {
        libc::atexit(unlink_at_exit);
        let handler = handle_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
        libc::signal(libc::SIGHUP, handler);
    }
    *registered = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_slot_rejects_unusable_names() {
        let _guard = REGISTRATION.lock();
        assert!(!store_name(""));
        assert!(!store_name(&"x".repeat(NAME_CAP)));
        assert!(!store_name("bad\0name"));
        assert!(store_name("/shmdb-cleanup-ok"));
    }

    #[test]
    fn unlink_once_fires_only_once() {
        // No shm object with this name exists; the call must still clear
        // the flag and stay idempotent.
        let _guard = REGISTRATION.lock();
        assert!(store_name("/shmdb-cleanup-never-created"));
        ENABLED.store(true, SeqCst);
        unlink_once();
        assert!(!ENABLED.load(SeqCst));
        unlink_once();
        assert!(!ENABLED.load(SeqCst));
    }
}
