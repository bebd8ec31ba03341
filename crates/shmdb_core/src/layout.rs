//! On-segment layout: header, node records, and region geometry.
//!
//! A segment is one contiguous mapping of four back-to-back regions,
//! `HEADER | BUCKETS | NODES | PAYLOAD`, with every persisted offset
//! relative to the segment base so any process can map it anywhere. The
//! structures here are `#[repr(C)]` and hold their cross-process mutable
//! fields as atomics; they are only ever accessed in place inside the
//! mapping, never moved.

use crate::error::{ShmError, ShmResult};
use std::cell::UnsafeCell;
use std::mem::size_of;
use std::sync::atomic::{AtomicU32, AtomicU64};

/// Format sentinel stamped into every segment header ("SHDB").
pub(crate) const MAGIC: u32 = u32::from_le_bytes(*b"SHDB");

/// Current format version.
pub(crate) const FORMAT_VERSION: u16 = 1;

/// Sentinel index meaning "empty bucket" or "end of chain".
pub(crate) const EMPTY_INDEX: u32 = 0xFFFF_FFFF;

/// Node flag bit 0: the node has been populated and published.
pub(crate) const NODE_FLAG_ACTIVE: u32 = 1;

/// Maximum key length in bytes (64 KiB).
pub(crate) const MAX_KEY_LEN: usize = 1 << 16;

/// Maximum value payload length in bytes (256 MiB).
pub(crate) const MAX_VAL_LEN: usize = 1 << 28;

/// Maximum total mapping size in bytes (4 GiB).
pub(crate) const MAX_TOTAL_SIZE: u64 = 1 << 32;

/// Maximum bucket count.
pub(crate) const MAX_BUCKETS: u64 = 1 << 24;

/// Maximum node count.
pub(crate) const MAX_NODES: u64 = 1 << 24;

/// Retry cap for the bucket-head and payload-cursor CAS loops.
pub(crate) const MAX_CAS_RETRIES: u32 = 10_000;

/// Capacity of the authorized-pid table.
pub(crate) const MAX_AUTH_PIDS: usize = 32;

/// Rounds `x` up to a multiple of `a` (`a` must be a power of two).
pub(crate) const fn align_up(x: u64, a: u64) -> u64 {
    (x + a - 1) & !(a - 1)
}

/// Persistent segment header, living at offset 0 of the mapping.
#[repr(C)]
pub(crate) struct Header {
    pub magic: u32,
    pub version: u16,
    pub flags: u16,
    pub total_size: u64,

    // Region offsets relative to the segment base.
    pub bucket_area_off: u64,
    pub node_area_off: u64,
    pub payload_area_off: u64,

    pub n_buckets: u32,
    pub n_nodes: u32,

    // Allocation cursors.
    pub next_free_node_index: AtomicU32,
    pub payload_alloc_off: AtomicU64,

    // Bumped on mutation entry/exit (and once more on writer failure).
    pub generation: AtomicU64,

    // Process-shared robust writer mutex, initialized in place.
    pub writer_mutex: UnsafeCell<libc::pthread_mutex_t>,

    pub checksum: u32,

    pub owner_uid: u32,
    pub owner_gid: u32,
    pub auth_pid_count: AtomicU32,
    pub auth_pids: [i32; MAX_AUTH_PIDS],

    pub create_time: u64,
    pub marked_for_delete: AtomicU32,

    pub reserved: [u8; 32],
}

/// One hash-chain record. Nodes are written once under the writer mutex and
/// never mutated or freed afterwards.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    // Offsets relative to the payload base.
    pub key_off: u32,
    pub key_len: u32,
    pub val_off: u32,
    pub val_len: u32,
    pub next_index: u32,
    pub flags: u32,
    pub version: u64,
    pub value_type: u8,
    pub reserved: [u8; 7],
}

/// Region sizes and offsets computed from requested capacities.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Geometry {
    pub header_size: u64,
    pub buckets_size: u64,
    pub nodes_size: u64,
    pub payload_size: u64,
    pub total_size: u64,
}

impl Geometry {
    /// Returns the header region size (header rounded to 64 bytes).
    pub fn header_region() -> u64 {
        align_up(size_of::<Header>() as u64, 64)
    }

    /// Computes region geometry for the requested capacities, checking for
    /// overflow and the total-size ceiling. Capacity *bounds* are the
    /// caller's job ([`SegmentConfig::validate`](crate::SegmentConfig::validate)).
    pub fn compute(n_buckets: u32, n_nodes: u32, payload_bytes: u64) -> ShmResult<Self> {
        let header_size = Self::header_region();
        let buckets_size = align_up(u64::from(n_buckets) * 4, 64);
        let nodes_size = align_up(u64::from(n_nodes) * size_of::<Node>() as u64, 64);
        let payload_size = align_up(payload_bytes, 4096);

        let total_size = header_size
            .checked_add(buckets_size)
            .and_then(|t| t.checked_add(nodes_size))
            .and_then(|t| t.checked_add(payload_size))
            .ok_or_else(|| ShmError::invalid_parameter("total size overflows"))?;

        if total_size > MAX_TOTAL_SIZE {
            return Err(ShmError::invalid_parameter(format!(
                "total size {total_size} exceeds maximum {MAX_TOTAL_SIZE}"
            )));
        }

        Ok(Self {
            header_size,
            buckets_size,
            nodes_size,
            payload_size,
            total_size,
        })
    }

    /// Offset of the bucket area.
    pub fn bucket_area_off(&self) -> u64 {
        self.header_size
    }

    /// Offset of the node area.
    pub fn node_area_off(&self) -> u64 {
        self.header_size + self.buckets_size
    }

    /// Offset of the payload area.
    pub fn payload_area_off(&self) -> u64 {
        self.header_size + self.buckets_size + self.nodes_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_basics() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(13, 8), 16);
        assert_eq!(align_up(4095, 4096), 4096);
        assert_eq!(align_up(4097, 4096), 8192);
    }

    #[test]
    fn node_is_fixed_size() {
        // 6 x u32 + u64 + tag byte + 7 reserved = 40 bytes; the node array
        // stride is part of the segment format.
        assert_eq!(size_of::<Node>(), 40);
    }

    #[test]
    fn header_spans_at_least_a_cache_line() {
        assert!(size_of::<Header>() >= 64);
        assert_eq!(Geometry::header_region() % 64, 0);
    }

    #[test]
    fn geometry_regions_are_aligned_and_ordered() {
        let g = Geometry::compute(16, 16, 64 * 1024).unwrap();
        assert_eq!(g.bucket_area_off() % 64, 0);
        assert_eq!(g.node_area_off() % 64, 0);
        assert_eq!(g.payload_area_off() % 64, 0);
        assert_eq!(g.payload_size % 4096, 0);
        assert!(g.bucket_area_off() + g.buckets_size <= g.node_area_off());
        assert!(g.node_area_off() + g.nodes_size <= g.payload_area_off());
        assert_eq!(g.payload_area_off() + g.payload_size, g.total_size);
    }

    #[test]
    fn geometry_rejects_oversized_totals() {
        assert!(Geometry::compute(1, 1, MAX_TOTAL_SIZE).is_err());
    }
}
