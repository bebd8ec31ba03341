//! # shmdb core
//!
//! Single-writer / many-reader, process-shared key-value store backed by a
//! POSIX shared-memory segment, with zero-copy typed value access.
//!
//! A segment is one relocatable mapping of four regions,
//! `HEADER | BUCKETS | NODES | PAYLOAD`. Writers serialize on a
//! process-shared robust mutex in the header and publish nodes with a
//! bucket-head CAS; readers never lock, validating each lookup against the
//! header's generation counter instead. Values are encoded once through
//! [`shmdb_codec`] and read in place by any process mapping the segment.
//!
//! ## Example
//!
//! ```no_run
//! use shmdb_core::{Segment, SegmentConfig};
//!
//! let segment = Segment::create("/my-segment", &SegmentConfig::default())?;
//! segment.insert_float_scalar(b"pi", std::f64::consts::PI)?;
//!
//! // Possibly in another process:
//! let reader = Segment::create("/my-segment", &SegmentConfig::default())?;
//! assert_eq!(reader.lookup_float_scalar(b"pi")?, std::f64::consts::PI);
//! # Ok::<(), shmdb_core::ShmError>(())
//! ```
//!
//! The segment is append-only: capacity is fixed at creation and entries
//! live until [`Segment::destroy`] unlinks the name.

mod cleanup;
mod config;
mod crypto;
mod error;
mod hash;
mod layout;
mod mutex;
mod perms;
mod segment;
mod stats;
mod typed;

pub use config::{SegmentConfig, AUTO_CLEANUP_ENV, LEGACY_SIZING_ENV};
pub use crypto::{SecretKey, AES_BLOCK_SIZE, AES_KEY_SIZE};
pub use error::{ShmError, ShmResult};
pub use segment::{Segment, ValueRef};
pub use stats::SegmentStats;

pub use shmdb_codec as codec;
pub use shmdb_codec::{Value, ValueType};
