//! Zone pool — empty/in-use partition of all zone identifiers
//!
//! The pool partitions `0..zone_count` into two disjoint sets at all
//! times. Acquisition picks the lowest empty identifier so allocation
//! order is deterministic for testing; any empty zone would be equally
//! valid.

use crate::error::{Result, ZoneMapError};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct ZonePool {
    empty: BTreeSet<u32>,
    in_use: BTreeSet<u32>,
    zone_count: u32,
}

impl ZonePool {
    /// Create a pool with all `zone_count` identifiers empty.
    pub fn new(zone_count: u32) -> Self {
        ZonePool {
            empty: (0..zone_count).collect(),
            in_use: BTreeSet::new(),
            zone_count,
        }
    }

    /// Move the lowest empty identifier to the in-use set and return it.
    pub fn acquire(&mut self) -> Result<u32> {
        let zone_id = *self.empty.iter().next().ok_or(ZoneMapError::ZonesExhausted)?;
        self.empty.remove(&zone_id);
        self.in_use.insert(zone_id);
        Ok(zone_id)
    }

    /// Return an in-use identifier to the empty set.
    ///
    /// The caller must have already reset the zone's write pointer and
    /// dropped every resident file record; the pool only tracks
    /// membership.
    pub fn release(&mut self, zone_id: u32) -> Result<()> {
        if !self.in_use.remove(&zone_id) {
            return Err(ZoneMapError::UnknownZone(zone_id));
        }
        self.empty.insert(zone_id);
        Ok(())
    }

    pub fn is_in_use(&self, zone_id: u32) -> bool {
        self.in_use.contains(&zone_id)
    }

    pub fn is_empty_zone(&self, zone_id: u32) -> bool {
        self.empty.contains(&zone_id)
    }

    pub fn zone_count(&self) -> u32 {
        self.zone_count
    }

    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }

    /// Check the partition invariant: the two sets are disjoint and
    /// together cover `0..zone_count` exactly.
    pub fn partition_holds(&self) -> bool {
        if self.empty.len() + self.in_use.len() != self.zone_count as usize {
            return false;
        }
        if self.empty.intersection(&self.in_use).next().is_some() {
            return false;
        }
        self.empty
            .union(&self.in_use)
            .copied()
            .eq(0..self.zone_count)
    }
}
