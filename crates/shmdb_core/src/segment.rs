//! Segment lifecycle, allocators, hash index, and the untyped KV surface.
//!
//! A [`Segment`] owns one POSIX shared-memory object mapped read-write.
//! One writer at a time mutates it under the in-header robust mutex;
//! readers are lock-free and validate every lookup against the generation
//! counter. All structural constants live in [`crate::layout`].

use crate::cleanup;
use crate::config::{self, SegmentConfig};
use crate::error::{ShmError, ShmResult};
use crate::hash::fnv1a_64;
use crate::layout::{
    align_up, Geometry, Header, Node, EMPTY_INDEX, FORMAT_VERSION, MAGIC, MAX_CAS_RETRIES,
    MAX_KEY_LEN, MAX_VAL_LEN, NODE_FLAG_ACTIVE,
};
use crate::mutex::{self, MutexGuard};
use crate::stats::SegmentStats;
use memmap2::{MmapOptions, MmapRaw};
use shmdb_codec::ValueType;
use std::ffi::CString;
use std::fs::File;
use std::os::fd::FromRawFd;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering::SeqCst};
use std::time::{SystemTime, UNIX_EPOCH};

/// How `create` resolves the mapping size against an existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SizingMode {
    /// Honor an existing segment's persisted `total_size`; caller sizes
    /// apply only when initializing a fresh object.
    Default,
    /// Always map with the caller-requested sizes, growing the file if
    /// needed (pre-versioned behavior, kept behind an env flag).
    Legacy,
}

/// A mapped shared-memory segment.
///
/// Dropping the handle unmaps the segment and closes the file descriptor;
/// it never unlinks the name. Other processes holding the segment are
/// unaffected.
pub struct Segment {
    name: String,
    map: MmapRaw,
    // Keeps the fd alive for the lifetime of the mapping.
    _file: File,
}

// SAFETY: all cross-thread mutation inside the mapping goes through
// atomics or the process-shared writer mutex; the handle itself holds no
// thread-affine state.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

/// A borrowed untyped value: the stored tag plus the raw payload bytes in
/// the segment. Valid while the segment handle is alive.
#[derive(Debug, Clone, Copy)]
pub struct ValueRef<'a> {
    tag: ValueType,
    bytes: &'a [u8],
}

impl<'a> ValueRef<'a> {
    /// The stored type tag.
    #[must_use]
    pub fn tag(&self) -> ValueType {
        self.tag
    }

    /// The raw payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn shm_name(name: &str) -> ShmResult<CString> {
    if name.is_empty() {
        return Err(ShmError::invalid_parameter("segment name is empty"));
    }
    if name.len() > 255 {
        return Err(ShmError::invalid_parameter("segment name too long"));
    }
    CString::new(name).map_err(|_| ShmError::invalid_parameter("segment name contains NUL"))
}

impl Segment {
    /// Creates or opens the shared-memory object `name`.
    ///
    /// New objects are sized from `config` and fully initialized. For
    /// existing objects the persisted header wins: the segment is mapped
    /// with its stored `total_size` and `config` is ignored, unless the
    /// legacy sizing env flag ([`crate::LEGACY_SIZING_ENV`]) is set, in
    /// which case caller sizes always apply.
    pub fn create(name: &str, config: &SegmentConfig) -> ShmResult<Self> {
        let mode = if config::legacy_sizing() {
            SizingMode::Legacy
        } else {
            SizingMode::Default
        };
        let segment = Self::create_with_mode(name, config, mode)?;
        if config::auto_cleanup() {
            cleanup::register(name);
        }
        Ok(segment)
    }

    pub(crate) fn create_with_mode(
        name: &str,
        config: &SegmentConfig,
        mode: SizingMode,
    ) -> ShmResult<Self> {
        let cname = shm_name(name)?;
        config.validate()?;
        let geometry = Geometry::compute(config.n_buckets, config.n_nodes, config.payload_bytes)?;

        // O_EXCL first so creation is detected reliably.
        let mut fd = unsafe {
            libc::shm_open(
                cname.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                0o666,
            )
        };
        if fd < 0 {
            if std::io::Error::last_os_error().raw_os_error() == Some(libc::EEXIST) {
                fd = unsafe { libc::shm_open(cname.as_ptr(), libc::O_RDWR, 0o666) };
            }
            if fd < 0 {
                return Err(ShmError::open_failed_os("shm_open"));
            }
        }
        // SAFETY: fd is a fresh, owned descriptor from shm_open.
        let file = unsafe { File::from_raw_fd(fd) };

        let st_size = file
            .metadata()
            .map_err(|e| ShmError::open_failed(format!("fstat: {e}")))?
            .len();

        let mut need_init = false;
        let map_total = match mode {
            SizingMode::Legacy => {
                if st_size < geometry.total_size {
                    file.set_len(geometry.total_size)
                        .map_err(|e| ShmError::open_failed(format!("ftruncate: {e}")))?;
                    need_init = true;
                }
                geometry.total_size
            }
            SizingMode::Default => {
                let existing = if st_size >= Geometry::header_region() {
                    Self::read_existing_total_size(&file)?
                } else {
                    None
                };
                match existing {
                    Some(total) => total,
                    None => {
                        if st_size < geometry.total_size {
                            file.set_len(geometry.total_size)
                                .map_err(|e| ShmError::open_failed(format!("ftruncate: {e}")))?;
                            need_init = true;
                        }
                        geometry.total_size
                    }
                }
            }
        };

        let map = MmapOptions::new()
            .len(map_total as usize)
            .map_raw(&file)
            .map_err(|e| ShmError::open_failed(format!("mmap: {e}")))?;

        let segment = Self {
            name: name.to_string(),
            map,
            _file: file,
        };

        // SAFETY: the mapping is at least `map_total` bytes and no other
        // process races initialization of a freshly truncated object; a
        // stale object with a bad magic is re-initialized the same way the
        // original format always has.
        unsafe {
            if need_init || segment.header().magic != MAGIC {
                segment.initialize(&geometry, map_total, config)?;
            }
        }

        Ok(segment)
    }

    /// Reads `total_size` from an existing object's header, mapping only
    /// the header region. Returns `None` when the header is not valid.
    fn read_existing_total_size(file: &File) -> ShmResult<Option<u64>> {
        let header_len = Geometry::header_region();
        let map = MmapOptions::new()
            .len(header_len as usize)
            .map_raw(file)
            .map_err(|e| ShmError::open_failed(format!("mmap header: {e}")))?;
        // SAFETY: the mapping covers the full header region.
        let (magic, version, total_size) = unsafe {
            let hdr = &*(map.as_ptr() as *const Header);
            (hdr.magic, hdr.version, hdr.total_size)
        };
        Ok((magic == MAGIC && version == FORMAT_VERSION && total_size >= header_len)
            .then_some(total_size))
    }

    /// Zeroes the mapping and writes a fresh header, empty buckets, and a
    /// newly initialized writer mutex.
    ///
    /// # Safety
    ///
    /// Caller guarantees the mapping spans `total_size` bytes and no other
    /// process is concurrently using the object.
    unsafe fn initialize(
        &self,
        geometry: &Geometry,
        total_size: u64,
        config: &SegmentConfig,
    ) -> ShmResult<()> {
        let base = self.map.as_mut_ptr();
        ptr::write_bytes(base, 0, total_size as usize);

        let hdr = base.cast::<Header>();
        (*hdr).magic = MAGIC;
        (*hdr).version = FORMAT_VERSION;
        (*hdr).flags = 0;
        (*hdr).total_size = total_size;
        (*hdr).bucket_area_off = geometry.bucket_area_off();
        (*hdr).node_area_off = geometry.node_area_off();
        (*hdr).payload_area_off = geometry.payload_area_off();
        (*hdr).n_buckets = config.n_buckets;
        (*hdr).n_nodes = config.n_nodes;

        let buckets = base.add(geometry.bucket_area_off() as usize).cast::<u32>();
        for i in 0..config.n_buckets as usize {
            *buckets.add(i) = EMPTY_INDEX;
        }

        mutex::init_in_place((*hdr).writer_mutex.get())?;

        (*hdr).owner_uid = libc::getuid();
        (*hdr).owner_gid = libc::getgid();
        (*hdr).auth_pids[0] = libc::getpid();
        (*hdr).auth_pid_count.store(1, SeqCst);
        (*hdr).create_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Ok(())
    }

    /// Unlinks the shared-memory object `name`.
    ///
    /// Existing mappings stay valid until their holders close; only the
    /// name is removed. Unlinking a name that does not exist is not an
    /// error.
    pub fn destroy(name: &str) -> ShmResult<()> {
        let cname = shm_name(name)?;
        let rc = unsafe { libc::shm_unlink(cname.as_ptr()) };
        if rc != 0 && std::io::Error::last_os_error().raw_os_error() != Some(libc::ENOENT) {
            return Err(ShmError::open_failed_os("shm_unlink"));
        }
        Ok(())
    }

    /// Unmaps the segment and closes the descriptor.
    ///
    /// Equivalent to dropping the handle; provided for callers that want
    /// the close to read explicitly.
    pub fn close(self) {}

    /// The shared-memory object name this handle was created with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of capacities, usage, and the generation counter.
    #[must_use]
    pub fn stats(&self) -> SegmentStats {
        let hdr = self.header();
        SegmentStats {
            n_buckets: hdr.n_buckets,
            n_nodes: hdr.n_nodes,
            nodes_used: hdr.next_free_node_index.load(SeqCst).min(hdr.n_nodes),
            payload_capacity: self.payload_capacity(),
            payload_used: hdr.payload_alloc_off.load(SeqCst),
            generation: hdr.generation.load(SeqCst),
        }
    }

    // ------------------------------------------------------------------
    // Region access
    // ------------------------------------------------------------------

    pub(crate) fn header(&self) -> &Header {
        // SAFETY: the mapping always spans at least the header region and
        // the header is never moved; cross-process mutable fields are
        // atomics or the mutex cell.
        unsafe { &*(self.map.as_ptr() as *const Header) }
    }

    pub(crate) fn header_mut_ptr(&self) -> *mut Header {
        self.map.as_mut_ptr().cast::<Header>()
    }

    pub(crate) fn payload_capacity(&self) -> u64 {
        let hdr = self.header();
        hdr.total_size - hdr.payload_area_off
    }

    fn bucket_atomic(&self, bucket: u32) -> &AtomicU32 {
        // SAFETY: bucket < n_buckets and the bucket area is 4-byte aligned
        // 32-bit slots inside the mapping.
        unsafe {
            let base = self
                .map
                .as_ptr()
                .add(self.header().bucket_area_off as usize)
                .cast::<AtomicU32>();
            &*base.add(bucket as usize)
        }
    }

    fn node_ptr(&self, index: u32) -> *mut Node {
        // Caller guarantees index < n_nodes.
        unsafe {
            self.map
                .as_mut_ptr()
                .add(self.header().node_area_off as usize)
                .cast::<Node>()
                .add(index as usize)
        }
    }

    /// Copies node `index` out of the array. Readers work on snapshots so
    /// a racing writer cannot change fields mid-inspection.
    fn node_snapshot(&self, index: u32) -> Node {
        // SAFETY: index was bounds-checked against n_nodes by the caller.
        unsafe { ptr::read_volatile(self.node_ptr(index)) }
    }

    fn payload_ptr(&self) -> *mut u8 {
        // SAFETY: payload_area_off is inside the mapping.
        unsafe {
            self.map
                .as_mut_ptr()
                .add(self.header().payload_area_off as usize)
        }
    }

    /// Borrows payload bytes. Caller must have bounds-checked
    /// `off + len <= payload_capacity`.
    pub(crate) fn payload_slice(&self, off: u32, len: u32) -> &[u8] {
        // SAFETY: range checked by the caller; published payload bytes are
        // never rewritten for the life of the segment.
        unsafe { std::slice::from_raw_parts(self.payload_ptr().add(off as usize), len as usize) }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.header().generation.load(SeqCst)
    }

    fn bump_generation(&self) {
        self.header().generation.fetch_add(1, SeqCst);
    }

    fn lock_writer(&self) -> ShmResult<MutexGuard<'_>> {
        // SAFETY: the mutex was initialized in place at segment creation
        // and lives in the mapping, which outlives the guard.
        unsafe { mutex::lock(self.header().writer_mutex.get()) }
    }

    // ------------------------------------------------------------------
    // Allocators
    // ------------------------------------------------------------------

    /// Reserves `len` bytes in the payload arena, advancing the bump cursor
    /// in 8-byte-aligned steps. Fails cleanly (cursor untouched) when the
    /// arena is exhausted or the CAS loop gives up.
    fn alloc_payload(&self, len: usize) -> Option<u64> {
        if len == 0 || len > MAX_VAL_LEN {
            return None;
        }
        let capacity = self.payload_capacity();
        let aligned = align_up(len as u64, 8);
        let cursor = &self.header().payload_alloc_off;
        for _ in 0..MAX_CAS_RETRIES {
            let current = cursor.load(SeqCst);
            if current + aligned > capacity {
                return None;
            }
            if cursor
                .compare_exchange(current, current + aligned, SeqCst, SeqCst)
                .is_ok()
            {
                return Some(current);
            }
        }
        None
    }

    /// Hands out the next node slot. Exhaustion is permanent: the counter
    /// is never decremented.
    fn alloc_node_index(&self) -> Option<u32> {
        let hdr = self.header();
        let index = hdr.next_free_node_index.fetch_add(1, SeqCst);
        (index < hdr.n_nodes).then_some(index)
    }

    // ------------------------------------------------------------------
    // Writer path
    // ------------------------------------------------------------------

    fn bucket_for(&self, key: &[u8]) -> u32 {
        (fnv1a_64(key) % u64::from(self.header().n_buckets)) as u32
    }

    pub(crate) fn validate_key(key: &[u8]) -> ShmResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(ShmError::invalid_parameter(format!(
                "key length must be in [1, {MAX_KEY_LEN}]"
            )));
        }
        Ok(())
    }

    /// The shared insert skeleton: every typed insert funnels here with an
    /// already-encoded payload.
    ///
    /// Keys are not deduplicated: inserting twice chains two nodes and
    /// lookups return the most recently published one. Upsert is a caller
    /// concern.
    pub(crate) fn insert_tagged(&self, key: &[u8], tag: ValueType, value: &[u8]) -> ShmResult<()> {
        Self::validate_key(key)?;

        let guard = self.lock_writer()?;
        self.bump_generation();
        let result = self.insert_locked(key, tag, value);
        // Success exits the mutation; failure bumps once more so readers
        // uniformly observe a generation change around every attempt.
        self.bump_generation();
        drop(guard);
        result
    }

    fn insert_locked(&self, key: &[u8], tag: ValueType, value: &[u8]) -> ShmResult<()> {
        let bucket = self.bucket_for(key);

        let key_off = self.alloc_payload(key.len()).ok_or(ShmError::NoSpace)?;
        // Null payloads reserve nothing; the node records a zero-length
        // value at offset 0.
        let val_off = if value.is_empty() {
            0
        } else {
            self.alloc_payload(value.len()).ok_or(ShmError::NoSpace)?
        };

        // SAFETY: offsets come from the bump allocator, which bounds them
        // against payload capacity.
        unsafe {
            let payload = self.payload_ptr();
            ptr::copy_nonoverlapping(key.as_ptr(), payload.add(key_off as usize), key.len());
            if !value.is_empty() {
                ptr::copy_nonoverlapping(value.as_ptr(), payload.add(val_off as usize), value.len());
            }
        }

        let node_index = self.alloc_node_index().ok_or(ShmError::NoSpace)?;
        let node_ptr = self.node_ptr(node_index);
        // SAFETY: node_index < n_nodes; the slot is untouched until the
        // bucket-head CAS publishes it.
        unsafe {
            ptr::write_volatile(
                node_ptr,
                Node {
                    key_off: key_off as u32,
                    key_len: key.len() as u32,
                    val_off: val_off as u32,
                    val_len: value.len() as u32,
                    next_index: EMPTY_INDEX,
                    flags: NODE_FLAG_ACTIVE,
                    version: 1,
                    value_type: tag.as_u8(),
                    reserved: [0; 7],
                },
            );
        }

        let head = self.bucket_atomic(bucket);
        for _ in 0..MAX_CAS_RETRIES {
            let old_head = head.load(SeqCst);
            // SAFETY: the node is still private to this writer.
            unsafe {
                ptr::write_volatile(ptr::addr_of_mut!((*node_ptr).next_index), old_head);
            }
            if head.compare_exchange(old_head, node_index, SeqCst, SeqCst).is_ok() {
                return Ok(());
            }
        }
        // The reserved node and payload bytes are leaked intentionally;
        // the arena is append-only and the leak is bounded by the retry cap.
        Err(ShmError::NoSpace)
    }

    // ------------------------------------------------------------------
    // Reader path
    // ------------------------------------------------------------------

    /// Walks the bucket chain for `key`, snapshotting nodes and
    /// bounds-checking every offset before it is dereferenced. Returns the
    /// matching node, `Ok(None)` when absent, or concurrent-modification
    /// when a torn node is observed.
    pub(crate) fn find_node(&self, key: &[u8]) -> ShmResult<Option<Node>> {
        let hdr = self.header();
        let capacity = self.payload_capacity();
        let mut index = self.bucket_atomic(self.bucket_for(key)).load(SeqCst);

        while index != EMPTY_INDEX {
            if index >= hdr.n_nodes {
                return Err(ShmError::ConcurrentModification);
            }
            let node = self.node_snapshot(index);
            if node.flags & NODE_FLAG_ACTIVE != 0 && node.key_len as usize == key.len() {
                if u64::from(node.key_off) + u64::from(node.key_len) > capacity {
                    return Err(ShmError::ConcurrentModification);
                }
                if self.payload_slice(node.key_off, node.key_len) == key {
                    if u64::from(node.val_off) + u64::from(node.val_len) > capacity {
                        return Err(ShmError::ConcurrentModification);
                    }
                    return Ok(Some(node));
                }
            }
            index = node.next_index;
        }
        Ok(None)
    }

    pub(crate) fn not_found(&self, g1: u64) -> ShmError {
        if self.generation() == g1 {
            ShmError::NotFound
        } else {
            ShmError::ConcurrentModification
        }
    }

    // ------------------------------------------------------------------
    // Untyped KV surface
    // ------------------------------------------------------------------

    /// Stores raw bytes under `key` with the [`ValueType::Unknown`] tag.
    pub fn insert(&self, key: &[u8], value: &[u8]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::Unknown, value)
    }

    /// Lock-free lookup returning a borrowed view of the stored bytes.
    pub fn lookup(&self, key: &[u8]) -> ShmResult<ValueRef<'_>> {
        Self::validate_key(key)?;
        let g1 = self.generation();
        let Some(node) = self.find_node(key)? else {
            return Err(self.not_found(g1));
        };
        let bytes = self.payload_slice(node.val_off, node.val_len);
        let tag = ValueType::from_u8(node.value_type);
        if self.generation() != g1 {
            return Err(ShmError::ConcurrentModification);
        }
        Ok(ValueRef { tag: tag?, bytes })
    }

    /// Lookup that copies the value into `out`.
    ///
    /// Returns the value length on success and [`ShmError::NoSpace`] when
    /// `out` is too small (nothing is written in that case).
    pub fn lookup_copy(&self, key: &[u8], out: &mut [u8]) -> ShmResult<usize> {
        let value = self.lookup(key)?;
        let len = value.len();
        if out.len() < len {
            return Err(ShmError::NoSpace);
        }
        out[..len].copy_from_slice(value.as_bytes());
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn test_name(tag: &str) -> String {
        format!(
            "/shmdb-seg-{tag}-{}-{}",
            std::process::id(),
            NAME_COUNTER.fetch_add(1, SeqCst)
        )
    }

    fn small_config() -> SegmentConfig {
        SegmentConfig::new()
            .n_buckets(16)
            .n_nodes(16)
            .payload_bytes(64 * 1024)
    }

    #[test]
    fn create_insert_lookup_roundtrip() {
        let name = test_name("roundtrip");
        let segment = Segment::create(&name, &small_config()).unwrap();

        segment.insert(b"hello", b"world").unwrap();
        let value = segment.lookup(b"hello").unwrap();
        assert_eq!(value.as_bytes(), b"world");
        assert_eq!(value.tag(), ValueType::Unknown);

        assert_eq!(segment.lookup(b"missing").unwrap_err(), ShmError::NotFound);

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn rejects_bad_names_and_bounds() {
        assert!(matches!(
            Segment::create("", &small_config()),
            Err(ShmError::InvalidParameter { .. })
        ));
        let name = test_name("bounds");
        assert!(matches!(
            Segment::create(&name, &SegmentConfig::new().n_buckets(0)),
            Err(ShmError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn duplicate_keys_newest_wins() {
        let name = test_name("dup");
        let segment = Segment::create(&name, &small_config()).unwrap();

        segment.insert(b"k", b"first").unwrap();
        segment.insert(b"k", b"second").unwrap();
        assert_eq!(segment.lookup(b"k").unwrap().as_bytes(), b"second");

        // Both nodes are retained; the segment is append-only.
        assert_eq!(segment.stats().nodes_used, 2);

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn lookup_copy_semantics() {
        let name = test_name("copy");
        let segment = Segment::create(&name, &small_config()).unwrap();
        segment.insert(b"k", b"abcde").unwrap();

        let mut buf = [0u8; 16];
        let len = segment.lookup_copy(b"k", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"abcde");

        let mut tiny = [0u8; 2];
        assert_eq!(
            segment.lookup_copy(b"k", &mut tiny).unwrap_err(),
            ShmError::NoSpace
        );

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn reopen_uses_persisted_sizes_by_default() {
        let name = test_name("reopen");
        let first = Segment::create(&name, &small_config()).unwrap();
        first.insert(b"persist", b"me").unwrap();
        let stats = first.stats();
        drop(first);

        // Reopen with wildly different requested capacities; the
        // persisted geometry must win.
        let bigger = SegmentConfig::new()
            .n_buckets(1024)
            .n_nodes(2048)
            .payload_bytes(1 << 22);
        let second =
            Segment::create_with_mode(&name, &bigger, SizingMode::Default).unwrap();
        let stats2 = second.stats();
        assert_eq!(stats2.n_buckets, stats.n_buckets);
        assert_eq!(stats2.n_nodes, stats.n_nodes);
        assert_eq!(stats2.payload_capacity, stats.payload_capacity);
        assert_eq!(second.lookup(b"persist").unwrap().as_bytes(), b"me");

        drop(second);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn legacy_mode_reinitializes_when_growing() {
        let name = test_name("legacy");
        let small = small_config();
        let first = Segment::create_with_mode(&name, &small, SizingMode::Legacy).unwrap();
        first.insert(b"old", b"data").unwrap();
        let capacity_before = first.stats().payload_capacity;
        drop(first);

        // Same sizes: the object is reopened in place, data intact.
        let same = Segment::create_with_mode(&name, &small, SizingMode::Legacy).unwrap();
        assert_eq!(same.lookup(b"old").unwrap().as_bytes(), b"data");
        drop(same);

        // Bigger request: legacy sizing grows the file and reinitializes,
        // wiping previous contents (the behavior the default mode exists
        // to avoid).
        let bigger = SegmentConfig::new()
            .n_buckets(16)
            .n_nodes(16)
            .payload_bytes(256 * 1024);
        let second = Segment::create_with_mode(&name, &bigger, SizingMode::Legacy).unwrap();
        assert!(second.stats().payload_capacity > capacity_before);
        assert_eq!(second.lookup(b"old").unwrap_err(), ShmError::NotFound);

        drop(second);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn no_space_bumps_generation_without_leaking() {
        let name = test_name("nospace");
        let segment = Segment::create(
            &name,
            &SegmentConfig::new().n_buckets(16).n_nodes(16).payload_bytes(4096),
        )
        .unwrap();

        let before = segment.stats();
        let oversized = vec![0xABu8; 5 * 1024];
        assert_eq!(
            segment.insert(b"big", &oversized).unwrap_err(),
            ShmError::NoSpace
        );
        let after = segment.stats();

        // The failed value reservation did not move the cursor past the
        // key's aligned reservation, and readers saw generation change.
        assert!(after.payload_used < after.payload_capacity);
        assert!(after.payload_used <= before.payload_used + 8);
        assert_eq!(after.generation, before.generation + 2);
        assert_eq!(segment.lookup(b"big").unwrap_err(), ShmError::NotFound);

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn node_exhaustion_reports_no_space() {
        let name = test_name("nodes");
        let segment = Segment::create(
            &name,
            &SegmentConfig::new().n_buckets(4).n_nodes(2).payload_bytes(4096),
        )
        .unwrap();

        segment.insert(b"a", b"1").unwrap();
        segment.insert(b"b", b"2").unwrap();
        assert_eq!(segment.insert(b"c", b"3").unwrap_err(), ShmError::NoSpace);
        // Earlier entries stay reachable.
        assert_eq!(segment.lookup(b"a").unwrap().as_bytes(), b"1");

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn generation_advances_twice_per_insert() {
        let name = test_name("gen");
        let segment = Segment::create(&name, &small_config()).unwrap();
        let g0 = segment.stats().generation;
        segment.insert(b"k", b"v").unwrap();
        assert_eq!(segment.stats().generation, g0 + 2);

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn empty_value_is_allowed() {
        let name = test_name("empty");
        let segment = Segment::create(&name, &small_config()).unwrap();
        segment.insert_tagged(b"null", ValueType::Null, &[]).unwrap();
        let value = segment.lookup(b"null").unwrap();
        assert!(value.is_empty());
        assert_eq!(value.tag(), ValueType::Null);

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn robust_mutex_recovers_after_dead_writer() {
        let name = test_name("robust");
        let segment = Segment::create(&name, &small_config()).unwrap();

        // A writer that dies holding the lock: the thread locks the mutex,
        // leaks the guard, and exits.
        std::thread::scope(|scope| {
            let s = &segment;
            scope
                .spawn(move || {
                    let guard = s.lock_writer().unwrap();
                    std::mem::forget(guard);
                })
                .join()
                .unwrap();
        });

        // The next writer observes EOWNERDEAD, heals the mutex, and
        // proceeds.
        segment.insert(b"after", b"crash").unwrap();
        assert_eq!(segment.lookup(b"after").unwrap().as_bytes(), b"crash");

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn fresh_header_fields_are_stamped() {
        let name = test_name("header");
        let segment = Segment::create(&name, &small_config()).unwrap();

        let hdr = segment.header();
        assert_eq!(hdr.magic, MAGIC);
        assert_eq!(hdr.version, FORMAT_VERSION);
        assert_eq!(hdr.flags, 0);
        assert_eq!(hdr.checksum, 0);
        assert_eq!(hdr.owner_uid, unsafe { libc::getuid() });
        assert_eq!(hdr.owner_gid, unsafe { libc::getgid() });
        assert_eq!(hdr.auth_pids[0], std::process::id() as i32);
        assert!(hdr.create_time > 0);
        assert_eq!(hdr.marked_for_delete.load(SeqCst), 0);
        assert_eq!(hdr.reserved, [0u8; 32]);

        // Region layout invariants persisted in the header.
        assert!(hdr.bucket_area_off + u64::from(hdr.n_buckets) * 4 <= hdr.node_area_off);
        assert!(
            hdr.node_area_off + u64::from(hdr.n_nodes) * std::mem::size_of::<Node>() as u64
                <= hdr.payload_area_off
        );
        assert!(hdr.payload_area_off <= hdr.total_size);

        // Node records are stamped with the active flag and version 1.
        segment.insert(b"k", b"v").unwrap();
        let node = segment.node_snapshot(0);
        assert_eq!(node.flags, NODE_FLAG_ACTIVE);
        assert_eq!(node.version, 1);
        assert_eq!(node.reserved, [0; 7]);

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn two_handles_share_one_segment() {
        // Two mappings of the same object land at different addresses;
        // everything must resolve through base-relative offsets.
        let name = test_name("twohandles");
        let writer = Segment::create(&name, &small_config()).unwrap();
        let reader = Segment::create(&name, &small_config()).unwrap();

        writer.insert(b"shared", b"bytes").unwrap();
        assert_eq!(reader.lookup(b"shared").unwrap().as_bytes(), b"bytes");
        assert_eq!(reader.stats().generation, writer.stats().generation);

        drop(writer);
        drop(reader);
        Segment::destroy(&name).unwrap();
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]
            #[test]
            fn untyped_roundtrip(
                key in proptest::collection::vec(any::<u8>(), 1..64),
                value in proptest::collection::vec(any::<u8>(), 0..256),
            ) {
                let name = test_name("prop");
                let segment = Segment::create(&name, &small_config()).unwrap();
                segment.insert(&key, &value).unwrap();
                let read = segment.lookup(&key).unwrap();
                prop_assert_eq!(read.as_bytes(), &value[..]);
                drop(segment);
                Segment::destroy(&name).unwrap();
            }
        }
    }

    #[test]
    fn key_validation() {
        let name = test_name("keyval");
        let segment = Segment::create(&name, &small_config()).unwrap();
        assert!(matches!(
            segment.insert(b"", b"v"),
            Err(ShmError::InvalidParameter { .. })
        ));
        assert!(matches!(
            segment.lookup(b""),
            Err(ShmError::InvalidParameter { .. })
        ));

        drop(segment);
        Segment::destroy(&name).unwrap();
    }
}
