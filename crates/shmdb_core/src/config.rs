//! Segment configuration and process-wide environment flags.

use crate::error::{ShmError, ShmResult};
use crate::layout::{MAX_BUCKETS, MAX_NODES, MAX_TOTAL_SIZE};

/// Environment variable selecting legacy sizing: when truthy, `create`
/// always maps using the caller-requested sizes, growing the file if
/// needed, instead of honoring an existing segment's persisted size.
pub const LEGACY_SIZING_ENV: &str = "SHMDB_CREATE_LEGACY";

/// Environment variable enabling best-effort auto-unlink of the first
/// segment created by this process, on normal exit and on
/// SIGINT/SIGTERM/SIGHUP.
pub const AUTO_CLEANUP_ENV: &str = "SHMDB_AUTO_CLEANUP";

fn env_truthy(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some("1" | "true" | "TRUE")
    )
}

pub(crate) fn legacy_sizing() -> bool {
    env_truthy(LEGACY_SIZING_ENV)
}

pub(crate) fn auto_cleanup() -> bool {
    env_truthy(AUTO_CLEANUP_ENV)
}

/// Capacities for creating a segment.
///
/// Capacity is fixed at creation; a segment is never rehashed or resized.
/// When `create` opens an existing segment (and legacy sizing is off), the
/// persisted capacities win and this configuration is ignored.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Number of hash buckets.
    pub n_buckets: u32,
    /// Capacity of the node array.
    pub n_nodes: u32,
    /// Requested payload arena size in bytes (rounded up to 4096).
    pub payload_bytes: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            n_buckets: 1 << 12,
            n_nodes: 1 << 16,
            payload_bytes: 1 << 24,
        }
    }
}

impl SegmentConfig {
    /// Creates a configuration with default capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bucket count.
    #[must_use]
    pub const fn n_buckets(mut self, n: u32) -> Self {
        self.n_buckets = n;
        self
    }

    /// Sets the node capacity.
    #[must_use]
    pub const fn n_nodes(mut self, n: u32) -> Self {
        self.n_nodes = n;
        self
    }

    /// Sets the payload arena size in bytes.
    #[must_use]
    pub const fn payload_bytes(mut self, bytes: u64) -> Self {
        self.payload_bytes = bytes;
        self
    }

    /// Validates the capacity bounds.
    pub fn validate(&self) -> ShmResult<()> {
        if self.n_buckets == 0 || u64::from(self.n_buckets) > MAX_BUCKETS {
            return Err(ShmError::invalid_parameter(format!(
                "n_buckets must be in [1, {MAX_BUCKETS}]"
            )));
        }
        if self.n_nodes == 0 || u64::from(self.n_nodes) > MAX_NODES {
            return Err(ShmError::invalid_parameter(format!(
                "n_nodes must be in [1, {MAX_NODES}]"
            )));
        }
        if self.payload_bytes == 0 || self.payload_bytes > MAX_TOTAL_SIZE {
            return Err(ShmError::invalid_parameter(format!(
                "payload_bytes must be in [1, {MAX_TOTAL_SIZE}]"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacities() {
        let config = SegmentConfig::default();
        assert_eq!(config.n_buckets, 4096);
        assert_eq!(config.n_nodes, 65536);
        assert_eq!(config.payload_bytes, 16 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder() {
        let config = SegmentConfig::new()
            .n_buckets(16)
            .n_nodes(32)
            .payload_bytes(65536);
        assert_eq!(config.n_buckets, 16);
        assert_eq!(config.n_nodes, 32);
        assert_eq!(config.payload_bytes, 65536);
    }

    #[test]
    fn bounds_are_enforced() {
        assert!(SegmentConfig::new().n_buckets(0).validate().is_err());
        assert!(SegmentConfig::new().n_nodes(0).validate().is_err());
        assert!(SegmentConfig::new().payload_bytes(0).validate().is_err());
        assert!(SegmentConfig::new()
            .n_buckets((1 << 24) + 1)
            .validate()
            .is_err());
    }
}
