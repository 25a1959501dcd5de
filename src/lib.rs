//! Zone allocation and file placement for log-structured stores
//!
//! `zonemap` is the mapping layer between a log-structured store and
//! zoned storage media: append-only, fixed-capacity erase units that
//! must be explicitly reset before reuse. For every stored file it
//! answers which zone holds it, where within that zone its bytes begin,
//! and how much of the zone's capacity is still live versus reclaimable.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy for mapping and device failures
//! - [`device`] - Zone device boundary and an in-memory implementation
//! - [`clock`] - Timestamp source for bookkeeping fields
//! - [`record`] - Per-file and per-zone records
//! - [`pool`] - Empty/in-use partition of zone identifiers
//! - [`mapping`] - The zone mapping manager
//!
//! ## Example Usage
//!
//! ```rust
//! use zonemap::ZoneMapping;
//!
//! // Two in-memory zones of 1 MiB each
//! let map = ZoneMapping::in_memory(2, 1 << 20);
//!
//! // Claim a zone and place a file on it
//! let zone = map.acquire_empty_zone().unwrap();
//! map.create_file("sst-001", zone).unwrap();
//! map.write_file("sst-001", b"hello zoned world").unwrap();
//! map.close_file("sst-001").unwrap();
//!
//! let data = map.read_file("sst-001", 0, 5).unwrap();
//! assert_eq!(&data, b"hello");
//!
//! // Deleting the last live file reclaims the zone
//! map.delete_file("sst-001").unwrap();
//! assert_eq!(map.empty_zone_count(), 2);
//! ```
//!
//! ## Guarantees
//!
//! - The empty/in-use sets always partition the zone identifiers.
//! - A zone's valid size equals the summed lengths of its resident
//!   closed files.
//! - A zone's write pointer is reset exactly once, when its last
//!   resident file is deleted; a zone holding live data never returns
//!   to the empty pool.
//! - Appends to one zone are serialized against its write pointer;
//!   deletion is idempotent for recovery replay.
//!
//! The mapping itself is in-memory; persisting it, choosing victims for
//! compaction, and retrying transient device errors all belong to the
//! surrounding store.

pub mod clock;
pub mod device;
pub mod error;
pub mod mapping;
pub mod pool;
pub mod record;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use device::{DeviceResult, MemZoneDevice, ZoneAddress, ZoneDevice, ZoneReport};
pub use error::{DeviceError, Result, ZoneMapError};
pub use mapping::{MappingStats, ZoneMapping};
pub use pool::ZonePool;
pub use record::{FileRecord, FileStatus, ZoneRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
