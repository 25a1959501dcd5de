//! Integration tests for the full file lifecycle across zones

use std::sync::Arc;
use zonemap::{
    ManualClock, MemZoneDevice, ZoneDevice, ZoneMapError, ZoneMapping,
};

const ZONE_CAPACITY: u64 = 1 << 20;

/// Helper building a mapping over explicit device handles so tests can
/// observe device-side state (write pointers, reset counts).
fn mapping_with_devices(zone_count: u32) -> (ZoneMapping, Vec<Arc<MemZoneDevice>>) {
    let devices: Vec<Arc<MemZoneDevice>> = (0..zone_count)
        .map(|id| Arc::new(MemZoneDevice::new(id, ZONE_CAPACITY)))
        .collect();
    let handles: Vec<Arc<dyn ZoneDevice>> = devices
        .iter()
        .map(|d| d.clone() as Arc<dyn ZoneDevice>)
        .collect();
    let map = ZoneMapping::new(handles, Arc::new(ManualClock::new(1))).unwrap();
    (map, devices)
}

#[test]
fn test_end_to_end_two_zones() {
    let (map, devices) = mapping_with_devices(2);

    let zone = map.acquire_empty_zone().unwrap();
    assert_eq!(zone, 0);

    map.create_file("a", zone).unwrap();
    assert_eq!(map.file_record("a").unwrap().offset, 0);

    map.write_file("a", &[7u8; 100]).unwrap();
    map.close_file("a").unwrap();
    assert_eq!(map.zone_record(zone).unwrap().valid_size, 100);

    map.delete_file("a").unwrap();

    // Zone 0 is back in the empty pool with its write pointer reset
    assert_eq!(map.empty_zone_count(), 2);
    assert_eq!(map.used_zone_count(), 0);
    assert_eq!(devices[0].report().unwrap().write_pointer, 0);
    assert_eq!(devices[0].reset_count(), 1);
    map.verify().unwrap();
}

#[test]
fn test_read_clamps_to_valid_bytes() {
    let (map, _devices) = mapping_with_devices(1);
    let zone = map.acquire_empty_zone().unwrap();
    map.create_file("a", zone).unwrap();
    map.write_file("a", &[3u8; 10]).unwrap();

    // Request far past the logical end: clamped, not an error
    let data = map.read_file("a", 5, 100).unwrap();
    assert_eq!(data, vec![3u8; 5]);

    // Offset exactly at the end reads zero bytes
    let data = map.read_file("a", 10, 100).unwrap();
    assert!(data.is_empty());

    // Offset past the end is an error
    let result = map.read_file("a", 11, 1);
    assert!(matches!(result, Err(ZoneMapError::OffsetOutOfRange { .. })));
}

#[test]
fn test_idempotent_delete_does_not_double_decrement() {
    let (map, devices) = mapping_with_devices(1);
    let zone = map.acquire_empty_zone().unwrap();
    map.create_file("a", zone).unwrap();
    map.create_file("b", zone).unwrap();
    map.write_file("a", &[0u8; 10]).unwrap();
    map.close_file("a").unwrap();

    map.delete_file("a").unwrap();
    map.delete_file("a").unwrap();
    map.delete_file("never-existed").unwrap();

    // "b" still holds the zone; no reset may have happened
    let record = map.zone_record(zone).unwrap();
    assert_eq!(record.valid_file_num, 1);
    assert_eq!(record.valid_size, 0);
    assert_eq!(map.used_zone_count(), 1);
    assert_eq!(devices[0].reset_count(), 0);
    map.verify().unwrap();
}

#[test]
fn test_no_reclaim_while_created_files_resident() {
    let (map, devices) = mapping_with_devices(1);
    let zone = map.acquire_empty_zone().unwrap();

    // "b" stays Created: valid_size is 0 but the zone must not reset
    map.create_file("a", zone).unwrap();
    map.create_file("b", zone).unwrap();
    map.write_file("b", &[1u8; 64]).unwrap();
    map.delete_file("a").unwrap();

    assert_eq!(devices[0].reset_count(), 0);
    assert_eq!(map.used_zone_count(), 1);

    // Deleting the last resident file finally reclaims
    map.delete_file("b").unwrap();
    assert_eq!(devices[0].reset_count(), 1);
    assert_eq!(map.empty_zone_count(), 1);
    map.verify().unwrap();
}

#[test]
fn test_zone_exhaustion() {
    let (map, _devices) = mapping_with_devices(2);
    map.acquire_empty_zone().unwrap();
    map.acquire_empty_zone().unwrap();

    let result = map.acquire_empty_zone();
    assert!(matches!(result, Err(ZoneMapError::ZonesExhausted)));

    // Reclaiming a zone makes acquisition possible again
    map.create_file("a", 0).unwrap();
    map.delete_file("a").unwrap();
    assert_eq!(map.acquire_empty_zone().unwrap(), 0);
}

#[test]
fn test_zone_cycles_through_many_lives() {
    let (map, devices) = mapping_with_devices(1);

    for generation in 0..5u32 {
        let zone = map.acquire_empty_zone().unwrap();
        let name = format!("sst-{generation}");
        map.create_file(&name, zone).unwrap();
        map.write_file(&name, &[generation as u8; 256]).unwrap();

        // Every generation starts at offset 0 after the reset
        assert_eq!(map.file_record(&name).unwrap().offset, 0);

        map.close_file(&name).unwrap();
        let data = map.read_file(&name, 0, 256).unwrap();
        assert_eq!(data, vec![generation as u8; 256]);

        map.delete_file(&name).unwrap();
        assert_eq!(devices[0].reset_count(), u64::from(generation) + 1);
    }
    map.verify().unwrap();
}

#[test]
fn test_interleaved_files_read_back_correctly() {
    let (map, _devices) = mapping_with_devices(1);
    let zone = map.acquire_empty_zone().unwrap();

    map.create_file("a", zone).unwrap();
    map.create_file("b", zone).unwrap();

    // Interleave appends; each file's bytes stay contiguous per write
    map.write_file("a", b"aaaa").unwrap();
    map.write_file("b", b"bbbb").unwrap();
    map.write_file("a", b"AAAA").unwrap();

    let a = map.file_record("a").unwrap();
    let b = map.file_record("b").unwrap();
    assert_eq!(a.offset, 0);
    assert_eq!(b.offset, 4);
    assert_eq!(a.length, 8);
    assert_eq!(b.length, 4);

    // "a" spans two device extents; the first is readable at its offset
    let head = map.read_file("a", 0, 4).unwrap();
    assert_eq!(&head, b"aaaa");
    let b_data = map.read_file("b", 0, 4).unwrap();
    assert_eq!(&b_data, b"bbbb");
}

#[test]
fn test_stats_snapshot_serializes() {
    let (map, _devices) = mapping_with_devices(3);
    let zone = map.acquire_empty_zone().unwrap();
    map.create_file("a", zone).unwrap();
    map.write_file("a", &[0u8; 32]).unwrap();
    map.close_file("a").unwrap();

    let json = serde_json::to_value(map.stats()).unwrap();
    assert_eq!(json["zone_count"], 3);
    assert_eq!(json["used_zones"], 1);
    assert_eq!(json["valid_bytes"], 32);
}
