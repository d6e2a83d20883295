//! Facilities (stations, outposts, settlements) and their market listings.

use ettu_common::Result;
use ettu_format::{
    Builder, FieldId, Offset, Table, TableMut, Vector,
    verifier::{Verifier, Verify},
};
use serde::{Deserialize, Serialize};

use crate::{Allegiance, FacilityFeatures, Government, Trade, to_owned_str, to_vec_or_empty};

/// Supply and demand listed at a facility's market.
#[derive(Clone, Copy)]
pub struct FacilityListingRef<'a>(Table<'a>);

ettu_format::table_ref!(FacilityListingRef);

impl<'a> FacilityListingRef<'a> {
    pub const SUPPLY: FieldId = 0;
    pub const DEMAND: FieldId = 1;
    pub const FIELD_COUNT: FieldId = 2;

    pub fn supply(&self) -> Result<Option<Vector<'a, Trade>>> {
        self.0.get_vector(Self::SUPPLY)
    }

    pub fn demand(&self) -> Result<Option<Vector<'a, Trade>>> {
        self.0.get_vector(Self::DEMAND)
    }

    /// Number of supply and demand entries.
    pub fn len(&self) -> Result<usize> {
        let supply = self.supply()?.map_or(0, |v| v.len());
        let demand = self.demand()?.map_or(0, |v| v.len());
        Ok(supply + demand)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn unpack(&self) -> Result<FacilityListing> {
        Ok(FacilityListing {
            supply: to_vec_or_empty(self.supply()?)?,
            demand: to_vec_or_empty(self.demand()?)?,
        })
    }
}

impl<'a> Verify<'a> for FacilityListingRef<'a> {
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> Result<()> {
        v.verify_vector_of_structs::<Trade>(table, Self::SUPPLY)?;
        v.verify_vector_of_structs::<Trade>(table, Self::DEMAND)
    }
}

impl std::fmt::Debug for FacilityListingRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityListingRef")
            .field("pos", &self.0.position())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityListing {
    pub supply: Vec<Trade>,
    pub demand: Vec<Trade>,
}

impl FacilityListing {
    pub fn is_empty(&self) -> bool {
        self.supply.is_empty() && self.demand.is_empty()
    }

    pub fn pack(&self, builder: &mut Builder) -> Offset<FacilityListing> {
        let supply = (!self.supply.is_empty())
            .then(|| builder.create_vector_of_structs(&self.supply));
        let demand = (!self.demand.is_empty())
            .then(|| builder.create_vector_of_structs(&self.demand));
        builder.start_table(FacilityListingRef::FIELD_COUNT);
        builder.add_offset_opt(FacilityListingRef::SUPPLY, supply);
        builder.add_offset_opt(FacilityListingRef::DEMAND, demand);
        builder.end_table()
    }
}

/// Reader for a facility table.
#[derive(Clone, Copy)]
pub struct FacilityRef<'a>(Table<'a>);

ettu_format::table_ref!(FacilityRef);

impl<'a> FacilityRef<'a> {
    pub const FACILITY_ID: FieldId = 0;
    pub const NAME: FieldId = 1;
    pub const FEATURES: FieldId = 2;
    pub const LS_FROM_STAR: FieldId = 3;
    pub const TYPE_ID: FieldId = 4;
    pub const GOVERNMENT: FieldId = 5;
    pub const ALLEGIANCE: FieldId = 6;
    pub const TIMESTAMP_UTC: FieldId = 7;
    pub const LISTING: FieldId = 8;
    pub const FIELD_COUNT: FieldId = 9;

    /// Key of the facility within its system.
    pub fn facility_id(&self) -> Result<u32> {
        self.0.get(Self::FACILITY_ID, 0)
    }

    pub fn name(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::NAME)
    }

    pub fn features(&self) -> Result<FacilityFeatures> {
        self.0
            .get::<u32>(Self::FEATURES, 0)
            .map(FacilityFeatures::from_bits_retain)
    }

    /// Distance from the arrival star, in light seconds.
    pub fn ls_from_star(&self) -> Result<f32> {
        self.0.get(Self::LS_FROM_STAR, 0.0)
    }

    pub fn type_id(&self) -> Result<i8> {
        self.0.get(Self::TYPE_ID, 0)
    }

    pub fn government(&self) -> Result<Government> {
        self.0
            .get(Self::GOVERNMENT, Government::default().0)
            .map(Government)
    }

    pub fn allegiance(&self) -> Result<Allegiance> {
        self.0
            .get(Self::ALLEGIANCE, Allegiance::default().0)
            .map(Allegiance)
    }

    pub fn timestamp_utc(&self) -> Result<u64> {
        self.0.get(Self::TIMESTAMP_UTC, 0)
    }

    pub fn listing(&self) -> Result<Option<FacilityListingRef<'a>>> {
        Ok(self.0.get_table(Self::LISTING)?.map(FacilityListingRef))
    }

    pub fn has_features(&self, mask: FacilityFeatures) -> Result<bool> {
        Ok(self.features()?.has_features(mask))
    }

    /// A facility trades if it has a market or lists any commodities.
    pub fn is_trading(&self) -> Result<bool> {
        if self.features()?.contains(FacilityFeatures::MARKET) {
            return Ok(true);
        }
        match self.listing()? {
            Some(listing) => Ok(!listing.is_empty()?),
            None => Ok(false),
        }
    }

    pub fn supports_pad_size(&self, size: FacilityFeatures) -> Result<bool> {
        Ok(self.features()?.supports_pad_size(size))
    }

    pub fn unpack(&self) -> Result<Facility> {
        Ok(Facility {
            facility_id: self.facility_id()?,
            name: to_owned_str(self.name()?),
            features: self.features()?,
            ls_from_star: self.ls_from_star()?,
            type_id: self.type_id()?,
            government: self.government()?,
            allegiance: self.allegiance()?,
            timestamp_utc: self.timestamp_utc()?,
            listing: self.listing()?.map(|l| l.unpack()).transpose()?,
        })
    }
}

impl<'a> Verify<'a> for FacilityRef<'a> {
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> Result<()> {
        v.verify_scalar::<u32>(table, Self::FACILITY_ID)?;
        v.verify_string(table, Self::NAME)?;
        v.verify_scalar::<u32>(table, Self::FEATURES)?;
        v.verify_scalar::<f32>(table, Self::LS_FROM_STAR)?;
        v.verify_scalar::<i8>(table, Self::TYPE_ID)?;
        v.verify_scalar::<i8>(table, Self::GOVERNMENT)?;
        v.verify_scalar::<i8>(table, Self::ALLEGIANCE)?;
        v.verify_scalar::<u64>(table, Self::TIMESTAMP_UTC)?;
        v.verify_table_field::<FacilityListingRef>(table, Self::LISTING)
    }
}

impl std::fmt::Debug for FacilityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityRef")
            .field("facility_id", &self.facility_id().ok())
            .field("name", &self.name().ok().flatten())
            .finish()
    }
}

/// In-place editor for the fixed-size fields of a facility.
///
/// Setters return `Ok(false)` when the field was not stored in the buffer.
pub struct FacilityMut<'a>(TableMut<'a>);

impl<'a> FacilityMut<'a> {
    pub fn new(table: TableMut<'a>) -> FacilityMut<'a> {
        FacilityMut(table)
    }

    /// Read-only view of the facility being edited.
    pub fn reader(&self) -> Result<FacilityRef<'_>> {
        Ok(FacilityRef(self.0.as_table()?))
    }

    pub fn set_features(&mut self, features: FacilityFeatures) -> Result<bool> {
        self.0.set(FacilityRef::FEATURES, features.bits())
    }

    pub fn set_ls_from_star(&mut self, ls: f32) -> Result<bool> {
        self.0.set(FacilityRef::LS_FROM_STAR, ls)
    }

    pub fn set_type_id(&mut self, type_id: i8) -> Result<bool> {
        self.0.set(FacilityRef::TYPE_ID, type_id)
    }

    pub fn set_government(&mut self, government: Government) -> Result<bool> {
        self.0.set(FacilityRef::GOVERNMENT, government.0)
    }

    pub fn set_allegiance(&mut self, allegiance: Allegiance) -> Result<bool> {
        self.0.set(FacilityRef::ALLEGIANCE, allegiance.0)
    }

    pub fn set_timestamp_utc(&mut self, timestamp: u64) -> Result<bool> {
        self.0.set(FacilityRef::TIMESTAMP_UTC, timestamp)
    }
}

/// Owned facility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    pub facility_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub features: FacilityFeatures,
    pub ls_from_star: f32,
    pub type_id: i8,
    pub government: Government,
    pub allegiance: Allegiance,
    pub timestamp_utc: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<FacilityListing>,
}

impl Facility {
    pub fn new(facility_id: u32, name: impl Into<String>) -> Facility {
        Facility {
            facility_id,
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_trading(&self) -> bool {
        self.features.contains(FacilityFeatures::MARKET)
            || self.listing.as_ref().is_some_and(|l| !l.is_empty())
    }

    /// Writes the facility and its listing, returning the table handle.
    pub fn pack(&self, builder: &mut Builder) -> Offset<Facility> {
        let name = self.name.as_deref().map(|s| builder.create_string(s));
        let listing = self.listing.as_ref().map(|l| l.pack(builder));

        builder.start_table(FacilityRef::FIELD_COUNT);
        builder.add_scalar(FacilityRef::TIMESTAMP_UTC, self.timestamp_utc, 0);
        builder.add_scalar(FacilityRef::FACILITY_ID, self.facility_id, 0);
        builder.add_offset_opt(FacilityRef::NAME, name);
        builder.add_scalar(FacilityRef::FEATURES, self.features.bits(), 0);
        builder.add_scalar(FacilityRef::LS_FROM_STAR, self.ls_from_star, 0.0);
        builder.add_offset_opt(FacilityRef::LISTING, listing);
        builder.add_scalar(FacilityRef::TYPE_ID, self.type_id, 0);
        builder.add_scalar(
            FacilityRef::GOVERNMENT,
            self.government.0,
            Government::default().0,
        );
        builder.add_scalar(
            FacilityRef::ALLEGIANCE,
            self.allegiance.0,
            Allegiance::default().0,
        );
        builder.end_table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ettu_format::{TableRef, root_table};

    fn sample() -> Facility {
        Facility {
            facility_id: 77,
            name: Some("Abraham Lincoln".to_string()),
            features: FacilityFeatures::LARGE_PAD | FacilityFeatures::SHIPYARD,
            ls_from_star: 496.5,
            type_id: 3,
            government: Government::Democracy,
            allegiance: Allegiance::Federation,
            timestamp_utc: 1_700_000_000,
            listing: Some(FacilityListing {
                supply: vec![Trade {
                    commodity_id: 5,
                    units: 1000,
                    credits: 250,
                    timestamp_utc: 1_700_000_100,
                }],
                demand: Vec::new(),
            }),
        }
    }

    fn build(facility: &Facility) -> Vec<u8> {
        let mut builder = Builder::new();
        let root = facility.pack(&mut builder);
        builder.finish(root, None);
        builder.finished_data().to_vec()
    }

    #[test]
    fn test_pack_unpack() {
        let facility = sample();
        let buf = build(&facility);
        let reader = FacilityRef::from_table(root_table(&buf).unwrap());
        assert_eq!(reader.unpack().unwrap(), facility);
        assert!(reader.is_trading().unwrap());
        assert!(reader.supports_pad_size(FacilityFeatures::MEDIUM_PAD).unwrap());
        assert!(!reader.has_features(FacilityFeatures::MARKET).unwrap());
        let listing = reader.listing().unwrap().unwrap();
        assert!(listing.demand().unwrap().is_none());
        assert_eq!(listing.supply().unwrap().unwrap().get(0).unwrap().units, 1000);
    }

    #[test]
    fn test_defaults_are_omitted() {
        let facility = Facility::new(1, "Outpost");
        let buf = build(&facility);
        let reader = FacilityRef::from_table(root_table(&buf).unwrap());
        let table = reader.table();
        for id in [
            FacilityRef::FEATURES,
            FacilityRef::GOVERNMENT,
            FacilityRef::ALLEGIANCE,
            FacilityRef::LISTING,
        ] {
            assert!(!table.is_present(id), "field {id}");
        }
        assert_eq!(reader.government().unwrap(), Government::Corporate);
        assert_eq!(reader.allegiance().unwrap(), Allegiance::Independent);
        assert!(!reader.is_trading().unwrap());
        assert_eq!(reader.unpack().unwrap(), facility);
    }

    #[test]
    fn test_empty_listing_is_not_trading() {
        let facility = Facility {
            listing: Some(FacilityListing::default()),
            ..Facility::new(2, "Empty")
        };
        assert!(!facility.is_trading());
        let buf = build(&facility);
        let reader = FacilityRef::from_table(root_table(&buf).unwrap());
        assert!(!reader.is_trading().unwrap());
        assert!(reader.listing().unwrap().unwrap().is_empty().unwrap());
    }

    #[test]
    fn test_mutate_present_fields() {
        let mut buf = build(&sample());
        let mut facility = FacilityMut::new(TableMut::root(&mut buf).unwrap());
        assert!(facility.set_government(Government::Anarchy).unwrap());
        assert!(facility.set_ls_from_star(12.0).unwrap());
        assert_eq!(
            facility.reader().unwrap().government().unwrap(),
            Government::Anarchy
        );

        let mut buf = build(&Facility::new(3, "Plain"));
        let before = buf.clone();
        let mut facility = FacilityMut::new(TableMut::root(&mut buf).unwrap());
        assert!(!facility.set_government(Government::Anarchy).unwrap());
        assert!(!facility.set_features(FacilityFeatures::MARKET).unwrap());
        assert_eq!(buf, before);
    }
}
