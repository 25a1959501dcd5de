//! Zone device boundary
//!
//! A zone is a fixed-capacity erase unit that only accepts sequential
//! appends at its device-tracked write pointer and must be explicitly
//! reset before reuse. The mapping layer talks to each zone through the
//! [`ZoneDevice`] trait and never assumes anything about the medium
//! behind it.

use crate::error::DeviceError;
use parking_lot::Mutex;

/// Result type for device-level operations.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Physical address of a byte range within a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneAddress {
    /// Zone identifier
    pub zone_id: u32,
    /// Byte offset within the zone
    pub offset: u64,
    /// Length of the range in bytes
    pub length: u64,
}

impl ZoneAddress {
    pub fn new(zone_id: u32, offset: u64, length: u64) -> Self {
        ZoneAddress {
            zone_id,
            offset,
            length,
        }
    }
}

/// Snapshot of a zone's device-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneReport {
    /// Zone identifier as reported by the device
    pub zone_id: u32,
    /// Offset at which the next append will land
    pub write_pointer: u64,
}

/// Minimum operations a zone device handle must support.
///
/// One handle addresses exactly one zone. Writes must land at the zone's
/// current write pointer; the device is free to reject out-of-order
/// writes. Reads are random-access within the written range. Reset
/// returns the write pointer to zero and must only be issued once no
/// live file references the zone.
pub trait ZoneDevice: Send + Sync {
    /// Report the zone's identity and current write pointer.
    fn report(&self) -> DeviceResult<ZoneReport>;

    /// Append `buf` at `addr`. `addr.offset` must equal the current
    /// write pointer and `addr.length` must equal `buf.len()`.
    fn write(&self, addr: ZoneAddress, buf: &[u8]) -> DeviceResult<()>;

    /// Read `addr.length` bytes starting at `addr.offset` into `out`.
    /// The range must lie entirely below the write pointer.
    fn read(&self, addr: ZoneAddress, out: &mut [u8]) -> DeviceResult<()>;

    /// Reset the write pointer to zero, discarding the zone's contents.
    fn reset_write_pointer(&self) -> DeviceResult<()>;
}

/// In-memory zone device.
///
/// Enforces the same discipline a real zoned device would: appends must
/// hit the write pointer exactly, the fixed capacity is never exceeded,
/// and reads past the write pointer are rejected. Used as the default
/// collaborator for tests and for embedding without real zoned media.
pub struct MemZoneDevice {
    zone_id: u32,
    capacity: u64,
    state: Mutex<MemZoneState>,
}

#[derive(Default)]
struct MemZoneState {
    data: Vec<u8>,
    write_pointer: u64,
    reset_count: u64,
}

impl MemZoneDevice {
    pub fn new(zone_id: u32, capacity: u64) -> Self {
        MemZoneDevice {
            zone_id,
            capacity,
            state: Mutex::new(MemZoneState::default()),
        }
    }

    /// Zone capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of write-pointer resets issued so far.
    pub fn reset_count(&self) -> u64 {
        self.state.lock().reset_count
    }
}

impl ZoneDevice for MemZoneDevice {
    fn report(&self) -> DeviceResult<ZoneReport> {
        let state = self.state.lock();
        Ok(ZoneReport {
            zone_id: self.zone_id,
            write_pointer: state.write_pointer,
        })
    }

    fn write(&self, addr: ZoneAddress, buf: &[u8]) -> DeviceResult<()> {
        let mut state = self.state.lock();

        if addr.offset != state.write_pointer {
            return Err(DeviceError::MisalignedWrite {
                zone_id: self.zone_id,
                write_pointer: state.write_pointer,
                requested: addr.offset,
            });
        }

        let end = state.write_pointer + buf.len() as u64;
        if end > self.capacity {
            return Err(DeviceError::ZoneFull {
                zone_id: self.zone_id,
                capacity: self.capacity,
                requested_end: end,
            });
        }

        state.data.extend_from_slice(buf);
        state.write_pointer = end;
        Ok(())
    }

    fn read(&self, addr: ZoneAddress, out: &mut [u8]) -> DeviceResult<()> {
        let state = self.state.lock();

        let end = addr.offset + addr.length;
        if end > state.write_pointer {
            return Err(DeviceError::ReadOutOfRange {
                zone_id: self.zone_id,
                write_pointer: state.write_pointer,
                requested_end: end,
            });
        }

        out[..addr.length as usize]
            .copy_from_slice(&state.data[addr.offset as usize..end as usize]);
        Ok(())
    }

    fn reset_write_pointer(&self) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.data.clear();
        state.write_pointer = 0;
        state.reset_count += 1;
        Ok(())
    }
}
