//! Owner and authorized-pid checks.
//!
//! The creating process stamps its uid/gid into the header and seeds the
//! authorized-pid table with its own pid. The owner may extend the table
//! (up to its fixed capacity); any listed pid counts as authorized.

use crate::error::{ShmError, ShmResult};
use crate::layout::MAX_AUTH_PIDS;
use crate::segment::Segment;
use std::ptr;
use std::sync::atomic::Ordering::SeqCst;

impl Segment {
    /// Whether the calling process's uid matches the segment owner.
    #[must_use]
    pub fn check_owner(&self) -> bool {
        // SAFETY: getuid never fails.
        unsafe { libc::getuid() == self.header().owner_uid }
    }

    /// Whether the calling process is the owner or listed in the
    /// authorized-pid table.
    #[must_use]
    pub fn check_authorized(&self) -> bool {
        if self.check_owner() {
            return true;
        }
        let pid = std::process::id() as i32;
        let count = self.header().auth_pid_count.load(SeqCst) as usize;
        let hdr = self.header_mut_ptr();
        for i in 0..count.min(MAX_AUTH_PIDS) {
            // SAFETY: i < MAX_AUTH_PIDS; concurrent owner appends are
            // tolerated, a half-visible tail entry just fails the match.
            let entry = unsafe { ptr::read_volatile(ptr::addr_of!((*hdr).auth_pids[i])) };
            if entry == pid {
                return true;
            }
        }
        false
    }

    /// Adds `pid` to the authorized table. Owner only; re-adding a listed
    /// pid succeeds, a full table reports no-space.
    pub fn add_authorized_pid(&self, pid: i32) -> ShmResult<()> {
        if !self.check_owner() {
            return Err(ShmError::PermissionDenied);
        }
        let count = self.header().auth_pid_count.load(SeqCst) as usize;
        let hdr = self.header_mut_ptr();
        for i in 0..count.min(MAX_AUTH_PIDS) {
            // SAFETY: i < MAX_AUTH_PIDS.
            let entry = unsafe { ptr::read_volatile(ptr::addr_of!((*hdr).auth_pids[i])) };
            if entry == pid {
                return Ok(());
            }
        }
        if count >= MAX_AUTH_PIDS {
            return Err(ShmError::NoSpace);
        }
        // SAFETY: count < MAX_AUTH_PIDS; the count is published after the
        // slot is written.
        unsafe {
            ptr::write_volatile(ptr::addr_of_mut!((*hdr).auth_pids[count]), pid);
        }
        self.header().auth_pid_count.fetch_add(1, SeqCst);
        Ok(())
    }
}
