//! Segment usage statistics.

/// A point-in-time snapshot of segment capacities and usage.
///
/// Values are read with individual atomic loads; a concurrent writer can
/// move `payload_used`, `nodes_used`, and `generation` between loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentStats {
    /// Hash bucket count.
    pub n_buckets: u32,
    /// Node array capacity.
    pub n_nodes: u32,
    /// Nodes handed out by the index allocator.
    pub nodes_used: u32,
    /// Payload arena capacity in bytes.
    pub payload_capacity: u64,
    /// Payload bytes reserved by the bump allocator.
    pub payload_used: u64,
    /// Current generation counter.
    pub generation: u64,
}
