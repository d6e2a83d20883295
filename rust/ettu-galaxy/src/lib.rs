//! Galaxy schema over `ettu-format` buffers.
//!
//! Each table of the schema has three faces:
//! - a zero-copy reader (`SystemRef`, `FacilityRef`, ...) wrapping a
//!   [`Table`](ettu_format::Table),
//! - a mutable view (`SystemMut`, `FacilityMut`) that can overwrite present
//!   fixed-size fields in place,
//! - an owned, serde-enabled object (`System`, `Facility`, ...) that packs
//!   itself into a [`Builder`](ettu_format::Builder) and can be unpacked from
//!   the reader.

pub mod commodity;
pub mod enums;
pub mod facility;
pub mod features;
pub mod galaxy;
pub mod structs;
pub mod system;


pub use commodity::{Commodity, CommodityRef};
pub use enums::{Allegiance, Government, SecurityLevel};
pub use facility::{Facility, FacilityListing, FacilityListingRef, FacilityMut, FacilityRef};
pub use features::FacilityFeatures;
pub use galaxy::{Galaxy, GalaxyMut, GalaxyRef, LayoutStats};
pub use structs::{Coordinate, Trade};
pub use system::{System, SystemMut, SystemRef};

use ettu_common::Result;
use ettu_format::{
    FILE_IDENTIFIER_LEN, TableRef,
    options::VerifierOptions,
    verifier::{Verifier, Verify},
};

/// File identifier written after the root offset of galaxy buffers.
pub const FILE_IDENTIFIER: &[u8; FILE_IDENTIFIER_LEN] = b"gomd";

/// Schema version recorded in galaxies built by this crate.
pub const SCHEMA_VERSION: &str = "1.0";

/// Verifies `buf` as a buffer rooted at a `T` table and opens the root.
pub(crate) fn open_verified<'a, T>(
    buf: &'a [u8],
    options: &VerifierOptions,
    file_identifier: Option<&[u8; FILE_IDENTIFIER_LEN]>,
) -> Result<T>
where
    T: TableRef<'a> + Verify<'a>,
{
    options.validate()?;
    let table = Verifier::new(buf, options.clone()).verify_root::<T>(file_identifier)?;
    Ok(T::from_table(table))
}

/// Converts an absent optional string into an owned value.
pub(crate) fn to_owned_str(s: Option<&str>) -> Option<String> {
    s.map(str::to_string)
}

/// Decodes an optional vector, treating an absent vector as empty.
pub(crate) fn to_vec_or_empty<'a, T>(vector: Option<ettu_format::Vector<'a, T>>) -> Result<Vec<T>>
where
    T: ettu_format::Follow<'a>,
{
    match vector {
        Some(vector) => vector.to_vec(),
        None => Ok(Vec::new()),
    }
}
