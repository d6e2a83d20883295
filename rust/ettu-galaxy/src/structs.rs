//! Inline structs: fixed layout, stored without indirection.

use byteorder::{ByteOrder, LittleEndian};
use ettu_format::codec::Struct;
use serde::{Deserialize, Serialize};

/// A point in galactic space, in light years.
///
/// Layout: `x: f64 @0, y: f64 @8, z: f64 @16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64, z: f64) -> Coordinate {
        Coordinate { x, y, z }
    }

    /// Squared distance to `other`.
    pub fn distance_sq(&self, other: &Coordinate) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }
}

impl Struct for Coordinate {
    const SIZE: usize = 24;
    const ALIGN: usize = 8;

    fn read_from(bytes: &[u8]) -> Self {
        Coordinate {
            x: LittleEndian::read_f64(&bytes[0..]),
            y: LittleEndian::read_f64(&bytes[8..]),
            z: LittleEndian::read_f64(&bytes[16..]),
        }
    }

    fn write_to(&self, bytes: &mut [u8]) {
        LittleEndian::write_f64(&mut bytes[0..], self.x);
        LittleEndian::write_f64(&mut bytes[8..], self.y);
        LittleEndian::write_f64(&mut bytes[16..], self.z);
    }
}

ettu_format::struct_follow!(Coordinate);

/// One commodity entry of a facility's supply or demand listing.
///
/// Layout: `commodity_id: u64 @0, units: u32 @8, credits: u16 @12,
/// padding @14, timestamp_utc: u64 @16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub commodity_id: u64,
    pub units: u32,
    pub credits: u16,
    pub timestamp_utc: u64,
}

impl Struct for Trade {
    const SIZE: usize = 24;
    const ALIGN: usize = 8;

    fn read_from(bytes: &[u8]) -> Self {
        Trade {
            commodity_id: LittleEndian::read_u64(&bytes[0..]),
            units: LittleEndian::read_u32(&bytes[8..]),
            credits: LittleEndian::read_u16(&bytes[12..]),
            timestamp_utc: LittleEndian::read_u64(&bytes[16..]),
        }
    }

    fn write_to(&self, bytes: &mut [u8]) {
        LittleEndian::write_u64(&mut bytes[0..], self.commodity_id);
        LittleEndian::write_u32(&mut bytes[8..], self.units);
        LittleEndian::write_u16(&mut bytes[12..], self.credits);
        bytes[14..16].fill(0);
        LittleEndian::write_u64(&mut bytes[16..], self.timestamp_utc);
    }
}

ettu_format::struct_follow!(Trade);
