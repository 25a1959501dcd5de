//! File and zone records
//!
//! The mapping's view of one logical file and one physical zone. A
//! `ZoneRecord`'s resident index stores file-name keys, never references
//! into the file table; resolution always goes back through the primary
//! table, so the records stay valid across any reallocation of the
//! backing storage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// File lifecycle state
///
/// Transitions run `Created` → `Closed` → `Deleted`. Reads and writes
/// are permitted before close; only `Deleted` records reject I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    /// Created and writable; its bytes do not yet count as valid
    Created,
    /// Closed; its length is folded into the zone's valid size
    Closed,
    /// Deleted; retained as a tombstone for audit
    Deleted,
}

/// The mapping's view of one logical file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique file name, stable for the record's lifetime
    pub file_name: String,

    /// Owning zone while live; `None` once deleted
    pub zone_id: Option<u32>,

    /// Byte offset within the zone where the file's data begins; fixed
    /// at creation from the zone's write pointer, never moved
    pub offset: u64,

    /// Cumulative bytes written; only grows while live, zeroed on delete
    pub length: u64,

    /// Lifecycle state
    pub status: FileStatus,

    /// Creation timestamp (microseconds, from the clock collaborator)
    pub create_time: u64,

    /// Deletion timestamp; 0 until the file is deleted
    pub delete_time: u64,
}

impl FileRecord {
    /// Create a record for a file placed at `offset` in `zone_id`.
    pub fn new(file_name: impl Into<String>, zone_id: u32, offset: u64, create_time: u64) -> Self {
        FileRecord {
            file_name: file_name.into(),
            zone_id: Some(zone_id),
            offset,
            length: 0,
            status: FileStatus::Created,
            create_time,
            delete_time: 0,
        }
    }

    /// Whether the record still occupies a zone.
    pub fn is_live(&self) -> bool {
        self.status != FileStatus::Deleted
    }

    /// Turn the record into a tombstone: placement zeroed, status
    /// `Deleted`, deletion time stamped.
    pub fn tombstone(&mut self, delete_time: u64) {
        self.zone_id = None;
        self.offset = 0;
        self.length = 0;
        self.status = FileStatus::Deleted;
        self.delete_time = delete_time;
    }
}

/// The mapping's view of one physical zone.
///
/// One record exists per zone for the lifetime of the system; it cycles
/// between empty and in-use as files come and go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRecord {
    /// Dense zone identifier
    pub zone_id: u32,

    /// Sum of lengths of resident Closed files
    pub valid_size: u64,

    /// Count of resident files, closed or not
    pub valid_file_num: u32,

    /// Names of files currently resident in this zone
    pub resident: BTreeSet<String>,
}

impl ZoneRecord {
    pub fn new(zone_id: u32) -> Self {
        ZoneRecord {
            zone_id,
            valid_size: 0,
            valid_file_num: 0,
            resident: BTreeSet::new(),
        }
    }

    /// Whether the zone holds no resident files and no valid bytes,
    /// i.e. is safe to reclaim.
    pub fn is_dead(&self) -> bool {
        self.valid_file_num == 0 && self.valid_size == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_starts_created() {
        let rec = FileRecord::new("sst-001", 4, 128, 1_000);
        assert_eq!(rec.zone_id, Some(4));
        assert_eq!(rec.offset, 128);
        assert_eq!(rec.length, 0);
        assert_eq!(rec.status, FileStatus::Created);
        assert_eq!(rec.create_time, 1_000);
        assert_eq!(rec.delete_time, 0);
        assert!(rec.is_live());
    }

    #[test]
    fn test_tombstone_clears_placement() {
        let mut rec = FileRecord::new("sst-001", 4, 128, 1_000);
        rec.length = 512;
        rec.tombstone(2_000);

        assert_eq!(rec.zone_id, None);
        assert_eq!(rec.offset, 0);
        assert_eq!(rec.length, 0);
        assert_eq!(rec.status, FileStatus::Deleted);
        assert_eq!(rec.delete_time, 2_000);
        assert!(!rec.is_live());
    }

    #[test]
    fn test_zone_record_dead_only_when_empty() {
        let mut zone = ZoneRecord::new(0);
        assert!(zone.is_dead());

        zone.valid_file_num = 1;
        assert!(!zone.is_dead());

        zone.valid_file_num = 0;
        zone.valid_size = 10;
        assert!(!zone.is_dead());
    }

    #[test]
    fn test_record_serialization() {
        let rec = FileRecord::new("sst-007", 2, 64, 42);
        let json = serde_json::to_string(&rec).unwrap();
        let back: FileRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.file_name, "sst-007");
        assert_eq!(back.zone_id, Some(2));
        assert_eq!(back.offset, 64);
        assert_eq!(back.status, FileStatus::Created);
    }
}
