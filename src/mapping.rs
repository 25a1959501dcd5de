//! Zone mapping manager
//!
//! Top-level component: owns the zone pool, the global file table and the
//! per-zone resident index, and answers where every file's bytes live.
//! All three tables are guarded by one exclusive lock; every operation is
//! a single critical section, which also serializes appends per zone (two
//! writers can never interleave their write-pointer queries).

use crate::clock::{Clock, SystemClock};
use crate::device::{MemZoneDevice, ZoneAddress, ZoneDevice};
use crate::error::{Result, ZoneMapError};
use crate::pool::ZonePool;
use crate::record::{FileRecord, FileStatus, ZoneRecord};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Aggregate counters over the whole mapping.
#[derive(Debug, Clone, Serialize)]
pub struct MappingStats {
    pub zone_count: u32,
    pub empty_zones: usize,
    pub used_zones: usize,
    pub live_files: usize,
    pub deleted_files: usize,
    /// Total valid (closed) bytes across all in-use zones
    pub valid_bytes: u64,
}

struct Inner {
    pool: ZonePool,
    zones: Vec<ZoneRecord>,
    files: HashMap<String, FileRecord>,
}

/// Zone allocation and file placement manager.
///
/// Hands out empty zones to new files, tracks per-zone occupancy and
/// per-file byte ranges, serializes appends against each zone's write
/// pointer, and reclaims a zone exactly when its last live file is
/// removed. Mapping state is in-memory; durability of the table is the
/// surrounding layer's responsibility.
pub struct ZoneMapping {
    devices: Vec<Arc<dyn ZoneDevice>>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl ZoneMapping {
    /// Create a mapping over caller-supplied device handles.
    ///
    /// `devices[i]` must address zone `i`; each handle's report is
    /// checked against its index.
    pub fn new(devices: Vec<Arc<dyn ZoneDevice>>, clock: Arc<dyn Clock>) -> Result<Self> {
        for (idx, device) in devices.iter().enumerate() {
            let report = device.report()?;
            if report.zone_id != idx as u32 {
                return Err(ZoneMapError::Corruption(format!(
                    "device at index {} reports zone {}",
                    idx, report.zone_id
                )));
            }
        }
        Ok(Self::from_parts(devices, clock))
    }

    /// Create a mapping backed by in-memory zones of `zone_capacity`
    /// bytes each, stamped by the system clock.
    pub fn in_memory(zone_count: u32, zone_capacity: u64) -> Self {
        let devices = (0..zone_count)
            .map(|id| Arc::new(MemZoneDevice::new(id, zone_capacity)) as Arc<dyn ZoneDevice>)
            .collect();
        Self::from_parts(devices, Arc::new(SystemClock))
    }

    fn from_parts(devices: Vec<Arc<dyn ZoneDevice>>, clock: Arc<dyn Clock>) -> Self {
        let zone_count = devices.len() as u32;
        ZoneMapping {
            devices,
            clock,
            inner: Mutex::new(Inner {
                pool: ZonePool::new(zone_count),
                zones: (0..zone_count).map(ZoneRecord::new).collect(),
                files: HashMap::new(),
            }),
        }
    }

    /// Number of zones managed.
    pub fn zone_count(&self) -> u32 {
        self.devices.len() as u32
    }

    /// Number of zones currently in the empty pool.
    pub fn empty_zone_count(&self) -> usize {
        self.inner.lock().pool.empty_count()
    }

    /// Number of zones currently claimed by at least one file.
    pub fn used_zone_count(&self) -> usize {
        self.inner.lock().pool.in_use_count()
    }

    /// Claim an empty zone for new files and return its identifier.
    ///
    /// Selection is lowest-identifier-first. Fails with
    /// [`ZoneMapError::ZonesExhausted`] when no empty zone remains.
    pub fn acquire_empty_zone(&self) -> Result<u32> {
        let mut inner = self.inner.lock();
        let zone_id = inner.pool.acquire()?;
        tracing::debug!(zone_id, "acquired empty zone");
        Ok(zone_id)
    }

    /// Create `name` on `zone_id`, placing it at the zone's current
    /// write pointer.
    ///
    /// Fails with [`ZoneMapError::FileAlreadyExists`] if any record for
    /// `name` exists (a deleted tombstone still blocks recreation) and
    /// [`ZoneMapError::UnknownZone`] if `zone_id` has not been acquired.
    pub fn create_file(&self, name: &str, zone_id: u32) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.files.contains_key(name) {
            return Err(ZoneMapError::FileAlreadyExists(name.to_string()));
        }
        if !inner.pool.is_in_use(zone_id) {
            return Err(ZoneMapError::UnknownZone(zone_id));
        }

        let report = self.device(zone_id)?.report()?;
        let record = FileRecord::new(name, zone_id, report.write_pointer, self.clock.now_micros());

        let zone = &mut inner.zones[zone_id as usize];
        zone.valid_file_num += 1;
        zone.resident.insert(name.to_string());
        inner.files.insert(name.to_string(), record);

        tracing::debug!(name, zone_id, offset = report.write_pointer, "created file");
        Ok(())
    }

    /// Append `buf` to `name` at its zone's current write pointer.
    ///
    /// On device success the file's length grows by `buf.len()`; if the
    /// file is already closed the zone's valid size grows with it, so
    /// the occupancy invariant stays exact. On device failure no
    /// metadata is mutated.
    pub fn write_file(&self, name: &str, buf: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        let zone_id = inner.live_zone_of(name)?;

        let device = self.device(zone_id)?;
        let report = device.report()?;
        let addr = ZoneAddress::new(zone_id, report.write_pointer, buf.len() as u64);
        device.write(addr, buf)?;

        let file = inner
            .files
            .get_mut(name)
            .ok_or_else(|| ZoneMapError::Corruption(format!("file table lost entry {name}")))?;
        file.length += buf.len() as u64;
        let closed = file.status == FileStatus::Closed;
        if closed {
            inner.zones[zone_id as usize].valid_size += buf.len() as u64;
        }

        tracing::debug!(name, zone_id, len = buf.len(), offset = addr.offset, "wrote file");
        Ok(())
    }

    /// Read up to `len` bytes of `name` starting at file-relative
    /// `offset`.
    ///
    /// Fails with [`ZoneMapError::OffsetOutOfRange`] if `offset` exceeds
    /// the file's length; a request running past the logical end is
    /// clamped to the valid remainder, not an error.
    pub fn read_file(&self, name: &str, offset: u64, len: u64) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        let zone_id = inner.live_zone_of(name)?;

        // live_zone_of verified the entry exists
        let file = &inner.files[name];
        if offset > file.length {
            return Err(ZoneMapError::OffsetOutOfRange {
                name: name.to_string(),
                offset,
                length: file.length,
            });
        }

        let valid_len = len.min(file.length - offset);
        let addr = ZoneAddress::new(zone_id, file.offset + offset, valid_len);
        let mut out = vec![0u8; valid_len as usize];
        self.device(zone_id)?.read(addr, &mut out)?;
        Ok(out)
    }

    /// Close `name`, folding its length into the zone's valid size.
    ///
    /// This is the point at which the file's bytes become valid capacity
    /// for the occupancy accounting. Closing an already-closed file is a
    /// no-op, so the fold can never double-count.
    pub fn close_file(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let zone_id = inner.live_zone_of(name)?;

        let file = inner
            .files
            .get_mut(name)
            .ok_or_else(|| ZoneMapError::Corruption(format!("file table lost entry {name}")))?;
        if file.status == FileStatus::Closed {
            return Ok(());
        }
        file.status = FileStatus::Closed;
        let length = file.length;
        inner.zones[zone_id as usize].valid_size += length;

        tracing::debug!(name, zone_id, length, "closed file");
        Ok(())
    }

    /// Delete `name`, reclaiming its zone if no live data remains.
    ///
    /// Deletion is idempotent: an absent name and an already-deleted
    /// record both succeed silently, so the surrounding layer can replay
    /// deletions during recovery. When the owning zone ends up with no
    /// resident files and no valid bytes, its write pointer is reset and
    /// it returns to the empty pool; the record itself is retained as a
    /// tombstone and keeps blocking name reuse.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();

        let (zone_id, length, status) = match inner.files.get(name) {
            None => return Ok(()),
            Some(file) if file.status == FileStatus::Deleted => return Ok(()),
            Some(file) => {
                let zone_id = file.zone_id.ok_or_else(|| {
                    ZoneMapError::Corruption(format!("live file {name} has no zone"))
                })?;
                (zone_id, file.length, file.status)
            }
        };
        if !inner.pool.is_in_use(zone_id) {
            tracing::warn!(name, zone_id, "live file references a zone not in use");
            return Err(ZoneMapError::Corruption(format!(
                "file {name} claims zone {zone_id} which is not in use"
            )));
        }

        let zone = &inner.zones[zone_id as usize];
        let closed_bytes = if status == FileStatus::Closed { length } else { 0 };
        let remaining_size = zone.valid_size.checked_sub(closed_bytes).ok_or_else(|| {
            ZoneMapError::Corruption(format!(
                "zone {zone_id} valid_size {} below file contribution {closed_bytes}",
                zone.valid_size
            ))
        })?;
        let remaining_files = zone.valid_file_num.checked_sub(1).ok_or_else(|| {
            ZoneMapError::Corruption(format!("zone {zone_id} file count underflow"))
        })?;

        // Reset the device before touching any table so a device failure
        // leaves the mapping state unchanged.
        let reclaim = remaining_files == 0 && remaining_size == 0;
        if reclaim {
            self.device(zone_id)?.reset_write_pointer()?;
        }

        let zone = &mut inner.zones[zone_id as usize];
        zone.valid_size = remaining_size;
        zone.valid_file_num = remaining_files;
        zone.resident.remove(name);
        if reclaim {
            inner.pool.release(zone_id)?;
            tracing::debug!(zone_id, "reclaimed zone");
        }

        let now = self.clock.now_micros();
        let file = inner
            .files
            .get_mut(name)
            .ok_or_else(|| ZoneMapError::Corruption(format!("file table lost entry {name}")))?;
        file.tombstone(now);

        tracing::debug!(name, zone_id, reclaimed = reclaim, "deleted file");
        Ok(())
    }

    /// Whether `name` currently occupies a zone (absent and deleted
    /// names are not live). Pure query, no side effects.
    pub fn is_file_live(&self, name: &str) -> bool {
        self.inner
            .lock()
            .files
            .get(name)
            .map(|f| f.is_live())
            .unwrap_or(false)
    }

    /// Snapshot of the record for `name`, tombstones included.
    pub fn file_record(&self, name: &str) -> Option<FileRecord> {
        self.inner.lock().files.get(name).cloned()
    }

    /// Snapshot of the record for `zone_id`.
    pub fn zone_record(&self, zone_id: u32) -> Option<ZoneRecord> {
        self.inner.lock().zones.get(zone_id as usize).cloned()
    }

    /// Aggregate counters over the whole mapping.
    pub fn stats(&self) -> MappingStats {
        let inner = self.inner.lock();
        let live_files = inner.files.values().filter(|f| f.is_live()).count();
        MappingStats {
            zone_count: inner.pool.zone_count(),
            empty_zones: inner.pool.empty_count(),
            used_zones: inner.pool.in_use_count(),
            live_files,
            deleted_files: inner.files.len() - live_files,
            valid_bytes: inner.zones.iter().map(|z| z.valid_size).sum(),
        }
    }

    /// Check every cross-table invariant the mapping maintains.
    ///
    /// Verifies the pool partition, the per-zone occupancy sums and the
    /// two-way consistency of the resident indices. Intended for tests
    /// and for the surrounding layer's own sanity sweeps; any failure is
    /// reported as [`ZoneMapError::Corruption`].
    pub fn verify(&self) -> Result<()> {
        let inner = self.inner.lock();

        if !inner.pool.partition_holds() {
            return Err(ZoneMapError::Corruption(
                "pool partition violated".to_string(),
            ));
        }

        for zone in &inner.zones {
            if inner.pool.is_empty_zone(zone.zone_id) && !zone.is_dead() {
                return Err(ZoneMapError::Corruption(format!(
                    "zone {} is pooled empty but holds live state",
                    zone.zone_id
                )));
            }
            if zone.valid_file_num as usize != zone.resident.len() {
                return Err(ZoneMapError::Corruption(format!(
                    "zone {} counts {} files but indexes {}",
                    zone.zone_id,
                    zone.valid_file_num,
                    zone.resident.len()
                )));
            }

            let mut closed_bytes = 0u64;
            for name in &zone.resident {
                let file = inner.files.get(name).ok_or_else(|| {
                    ZoneMapError::Corruption(format!(
                        "zone {} indexes unknown file {name}",
                        zone.zone_id
                    ))
                })?;
                if file.zone_id != Some(zone.zone_id) {
                    return Err(ZoneMapError::Corruption(format!(
                        "file {name} indexed on zone {} but records {:?}",
                        zone.zone_id, file.zone_id
                    )));
                }
                if file.status == FileStatus::Closed {
                    closed_bytes += file.length;
                }
            }
            if closed_bytes != zone.valid_size {
                return Err(ZoneMapError::Corruption(format!(
                    "zone {} valid_size {} but closed bytes sum to {closed_bytes}",
                    zone.zone_id, zone.valid_size
                )));
            }
        }

        for file in inner.files.values().filter(|f| f.is_live()) {
            let zone_id = file.zone_id.ok_or_else(|| {
                ZoneMapError::Corruption(format!("live file {} has no zone", file.file_name))
            })?;
            if !inner.pool.is_in_use(zone_id) {
                return Err(ZoneMapError::Corruption(format!(
                    "live file {} on zone {zone_id} not in use",
                    file.file_name
                )));
            }
            if !inner.zones[zone_id as usize].resident.contains(&file.file_name) {
                return Err(ZoneMapError::Corruption(format!(
                    "live file {} missing from zone {zone_id} resident index",
                    file.file_name
                )));
            }
        }

        Ok(())
    }

    fn device(&self, zone_id: u32) -> Result<&Arc<dyn ZoneDevice>> {
        self.devices.get(zone_id as usize).ok_or_else(|| {
            ZoneMapError::Corruption(format!("no device handle for zone {zone_id}"))
        })
    }
}

impl Inner {
    /// Resolve `name` to its owning in-use zone, rejecting deleted
    /// records. Shared lookup path of write/read/close.
    fn live_zone_of(&self, name: &str) -> Result<u32> {
        let file = self
            .files
            .get(name)
            .ok_or_else(|| ZoneMapError::FileNotFound(name.to_string()))?;
        if file.status == FileStatus::Deleted {
            return Err(ZoneMapError::InvalidState {
                name: name.to_string(),
                status: file.status,
            });
        }
        let zone_id = file
            .zone_id
            .ok_or_else(|| ZoneMapError::Corruption(format!("live file {name} has no zone")))?;
        if !self.pool.is_in_use(zone_id) {
            tracing::warn!(name, zone_id, "live file references a zone not in use");
            return Err(ZoneMapError::Corruption(format!(
                "file {name} claims zone {zone_id} which is not in use"
            )));
        }
        Ok(zone_id)
    }
}
