use crate::record::FileStatus;
use thiserror::Error;

/// Errors reported by a zone device handle.
///
/// These are propagated unchanged through the mapping layer; the mapping
/// never reinterprets or retries a device failure.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error(
        "misaligned write on zone {zone_id}: requested offset {requested}, write pointer at {write_pointer}"
    )]
    MisalignedWrite {
        zone_id: u32,
        write_pointer: u64,
        requested: u64,
    },

    #[error("zone {zone_id} full: write would end at {requested_end}, capacity {capacity}")]
    ZoneFull {
        zone_id: u32,
        capacity: u64,
        requested_end: u64,
    },

    #[error(
        "read past write pointer on zone {zone_id}: requested end {requested_end}, write pointer at {write_pointer}"
    )]
    ReadOutOfRange {
        zone_id: u32,
        write_pointer: u64,
        requested_end: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ZoneMapError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file already exists: {0}")]
    FileAlreadyExists(String),

    #[error("zone {0} is not allocated")]
    UnknownZone(u32),

    #[error("file {name} is {status:?}, operation not permitted")]
    InvalidState { name: String, status: FileStatus },

    #[error("read offset {offset} beyond file length {length} for {name}")]
    OffsetOutOfRange {
        name: String,
        offset: u64,
        length: u64,
    },

    #[error("out of zones: no empty zone available")]
    ZonesExhausted,

    #[error("mapping corruption: {0}")]
    Corruption(String),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

pub type Result<T> = std::result::Result<T, ZoneMapError>;
