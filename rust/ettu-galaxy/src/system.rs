//! Star systems.

use ettu_bytes::Bytes;
use ettu_common::Result;
use ettu_format::{
    Builder, FieldId, Offset, Table, TableMut, TableRef, Vector,
    options::{BuilderOptions, VerifierOptions},
    root_table,
    sorted::lookup_by_key,
    verifier::{Verifier, Verify},
};
use serde::{Deserialize, Serialize};

use crate::{
    Allegiance, Coordinate, Facility, FacilityMut, FacilityRef, Government, SecurityLevel,
    open_verified, to_owned_str,
};

/// Reader for a system table.
#[derive(Clone, Copy)]
pub struct SystemRef<'a>(Table<'a>);

ettu_format::table_ref!(SystemRef);

impl<'a> SystemRef<'a> {
    pub const SYSTEM_ID: FieldId = 0;
    pub const NAME: FieldId = 1;
    pub const POSITION: FieldId = 2;
    pub const TIMESTAMP_UTC: FieldId = 3;
    pub const POWER: FieldId = 4;
    pub const POPULATED: FieldId = 5;
    pub const NEEDS_PERMIT: FieldId = 6;
    pub const SECURITY: FieldId = 7;
    pub const GOVERNMENT: FieldId = 8;
    pub const ALLEGIANCE: FieldId = 9;
    pub const ED_ADDRESS: FieldId = 10;
    pub const FACILITIES: FieldId = 11;
    pub const FIELD_COUNT: FieldId = 12;

    /// Verifies `buf` and opens the system at its root.
    pub fn open(buf: &'a [u8]) -> Result<SystemRef<'a>> {
        Self::open_with_options(buf, &VerifierOptions::default())
    }

    pub fn open_with_options(buf: &'a [u8], options: &VerifierOptions) -> Result<SystemRef<'a>> {
        open_verified(buf, options, None)
    }

    /// Opens the root system without verifying the buffer. Malformed data
    /// still surfaces as errors from the individual accessors.
    pub fn read_root(buf: &'a [u8]) -> Result<SystemRef<'a>> {
        root_table(buf).map(SystemRef)
    }

    /// Key of the system within a galaxy.
    pub fn system_id(&self) -> Result<u32> {
        self.0.get(Self::SYSTEM_ID, 0)
    }

    pub fn name(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::NAME)
    }

    pub fn position(&self) -> Result<Option<Coordinate>> {
        self.0.get_struct(Self::POSITION)
    }

    pub fn timestamp_utc(&self) -> Result<u64> {
        self.0.get(Self::TIMESTAMP_UTC, 0)
    }

    /// Controlling power, if any.
    pub fn power(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::POWER)
    }

    pub fn populated(&self) -> Result<bool> {
        self.0.get(Self::POPULATED, true)
    }

    pub fn needs_permit(&self) -> Result<bool> {
        self.0.get(Self::NEEDS_PERMIT, false)
    }

    pub fn security(&self) -> Result<SecurityLevel> {
        self.0
            .get(Self::SECURITY, SecurityLevel::default().0)
            .map(SecurityLevel)
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

    pub fn ed_address(&self) -> Result<u64> {
        self.0.get(Self::ED_ADDRESS, 0)
    }

    /// Facilities, ordered by `facility_id`.
    pub fn facilities(&self) -> Result<Option<Vector<'a, FacilityRef<'a>>>> {
        self.0.get_vector(Self::FACILITIES)
    }

    pub fn num_facilities(&self) -> Result<usize> {
        Ok(self.facilities()?.map_or(0, |v| v.len()))
    }

    /// Binary search for the facility with the given id.
    pub fn facility_by_key(&self, facility_id: u32) -> Result<Option<FacilityRef<'a>>> {
        match self.facilities()? {
            Some(facilities) => lookup_by_key(&facilities, &facility_id, |f| f.facility_id()),
            None => Ok(None),
        }
    }

    /// Linear search for a facility by name, ignoring ASCII case.
    pub fn facility_by_name(&self, name: &str) -> Result<Option<FacilityRef<'a>>> {
        let Some(facilities) = self.facilities()? else {
            return Ok(None);
        };
        for facility in facilities.iter() {
            let facility = facility?;
            if facility.name()?.is_some_and(|n| n.eq_ignore_ascii_case(name)) {
                return Ok(Some(facility));
            }
        }
        Ok(None)
    }

    /// Squared distance between two systems, when both have a position.
    pub fn distance_sq(&self, other: &SystemRef) -> Result<Option<f64>> {
        match (self.position()?, other.position()?) {
            (Some(a), Some(b)) => Ok(Some(a.distance_sq(&b))),
            _ => Ok(None),
        }
    }

    pub fn unpack(&self) -> Result<System> {
        let facilities = match self.facilities()? {
            Some(facilities) => facilities
                .iter()
                .map(|f| f.and_then(|f| f.unpack()))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(System {
            system_id: self.system_id()?,
            name: to_owned_str(self.name()?),
            position: self.position()?,
            timestamp_utc: self.timestamp_utc()?,
            power: to_owned_str(self.power()?),
            populated: self.populated()?,
            needs_permit: self.needs_permit()?,
            security: self.security()?,
            government: self.government()?,
            allegiance: self.allegiance()?,
            ed_address: self.ed_address()?,
            facilities,
        })
    }
}

impl<'a> Verify<'a> for SystemRef<'a> {
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> Result<()> {
        v.verify_scalar::<u32>(table, Self::SYSTEM_ID)?;
        v.verify_string(table, Self::NAME)?;
        v.verify_struct::<Coordinate>(table, Self::POSITION)?;
        v.verify_scalar::<u64>(table, Self::TIMESTAMP_UTC)?;
        v.verify_string(table, Self::POWER)?;
        v.verify_scalar::<bool>(table, Self::POPULATED)?;
        v.verify_scalar::<bool>(table, Self::NEEDS_PERMIT)?;
        v.verify_scalar::<i8>(table, Self::SECURITY)?;
        v.verify_scalar::<i8>(table, Self::GOVERNMENT)?;
        v.verify_scalar::<i8>(table, Self::ALLEGIANCE)?;
        v.verify_scalar::<u64>(table, Self::ED_ADDRESS)?;
        v.verify_vector_of_tables::<FacilityRef>(table, Self::FACILITIES)
    }
}

impl std::fmt::Debug for SystemRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRef")
            .field("system_id", &self.system_id().ok())
            .field("name", &self.name().ok().flatten())
            .finish()
    }
}

/// In-place editor for the fixed-size fields of a system and its facilities.
///
/// Setters return `Ok(false)` when the field was not stored in the buffer
/// (it held its default when the buffer was built); the buffer is then left
/// unchanged. The key field is not editable since that would break the
/// ordering lookups rely on.
pub struct SystemMut<'a>(TableMut<'a>);

impl<'a> SystemMut<'a> {
    pub fn new(table: TableMut<'a>) -> SystemMut<'a> {
        SystemMut(table)
    }

    /// Opens the root system of `buf` for editing.
    pub fn root(buf: &'a mut [u8]) -> Result<SystemMut<'a>> {
        TableMut::root(buf).map(SystemMut)
    }

    /// Read-only view of the system being edited.
    pub fn reader(&self) -> Result<SystemRef<'_>> {
        Ok(SystemRef(self.0.as_table()?))
    }

    pub fn set_position(&mut self, position: &Coordinate) -> Result<bool> {
        self.0.set_struct(SystemRef::POSITION, position)
    }

    pub fn set_timestamp_utc(&mut self, timestamp: u64) -> Result<bool> {
        self.0.set(SystemRef::TIMESTAMP_UTC, timestamp)
    }

    pub fn set_populated(&mut self, populated: bool) -> Result<bool> {
        self.0.set(SystemRef::POPULATED, populated)
    }

    pub fn set_needs_permit(&mut self, needs_permit: bool) -> Result<bool> {
        self.0.set(SystemRef::NEEDS_PERMIT, needs_permit)
    }

    pub fn set_security(&mut self, security: SecurityLevel) -> Result<bool> {
        self.0.set(SystemRef::SECURITY, security.0)
    }

    pub fn set_government(&mut self, government: Government) -> Result<bool> {
        self.0.set(SystemRef::GOVERNMENT, government.0)
    }

    pub fn set_allegiance(&mut self, allegiance: Allegiance) -> Result<bool> {
        self.0.set(SystemRef::ALLEGIANCE, allegiance.0)
    }

    pub fn set_ed_address(&mut self, ed_address: u64) -> Result<bool> {
        self.0.set(SystemRef::ED_ADDRESS, ed_address)
    }

    /// Editor for the facility at `index` in key order.
    pub fn facility_mut(&mut self, index: usize) -> Result<Option<FacilityMut<'_>>> {
        Ok(self
            .0
            .vector_table(SystemRef::FACILITIES, index)?
            .map(FacilityMut::new))
    }

    /// Editor for the facility with the given id.
    pub fn facility_mut_by_key(&mut self, facility_id: u32) -> Result<Option<FacilityMut<'_>>> {
        let found = self.reader()?.facility_by_key(facility_id)?;
        let Some(pos) = found.map(|f| f.table().position()) else {
            return Ok(None);
        };
        Ok(Some(FacilityMut::new(self.0.table_at(pos)?)))
    }
}

/// Owned system, including its facilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct System {
    pub system_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,
    pub timestamp_utc: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    pub populated: bool,
    pub needs_permit: bool,
    pub security: SecurityLevel,
    pub government: Government,
    pub allegiance: Allegiance,
    pub ed_address: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facilities: Vec<Facility>,
}

impl Default for System {
    fn default() -> Self {
        System {
            system_id: 0,
            name: None,
            position: None,
            timestamp_utc: 0,
            power: None,
            populated: true,
            needs_permit: false,
            security: SecurityLevel::default(),
            government: Government::default(),
            allegiance: Allegiance::default(),
            ed_address: 0,
            facilities: Vec::new(),
        }
    }
}

impl System {
    pub fn new(system_id: u32, name: impl Into<String>, position: Coordinate) -> System {
        System {
            system_id,
            name: Some(name.into()),
            position: Some(position),
            ..Default::default()
        }
    }

    /// Writes the system and its facilities, returning the table handle.
    /// Facilities are stored sorted by `facility_id`.
    pub fn pack(&self, builder: &mut Builder) -> Offset<System> {
        let name = self.name.as_deref().map(|s| builder.create_string(s));
        let power = self.power.as_deref().map(|s| builder.create_shared_string(s));
        let facilities = if self.facilities.is_empty() {
            None
        } else {
            let mut offsets = self
                .facilities
                .iter()
                .map(|f| f.pack(builder))
                .collect::<Vec<_>>();
            Some(builder.create_sorted_vector_of_tables(
                &mut offsets,
                FacilityRef::FACILITY_ID,
                0u32,
            ))
        };

        builder.start_table(SystemRef::FIELD_COUNT);
        if let Some(position) = &self.position {
            builder.add_struct(SystemRef::POSITION, position);
        }
        builder.add_scalar(SystemRef::TIMESTAMP_UTC, self.timestamp_utc, 0);
        builder.add_scalar(SystemRef::ED_ADDRESS, self.ed_address, 0);
        builder.add_scalar(SystemRef::SYSTEM_ID, self.system_id, 0);
        builder.add_offset_opt(SystemRef::NAME, name);
        builder.add_offset_opt(SystemRef::POWER, power);
        builder.add_offset_opt(SystemRef::FACILITIES, facilities);
        builder.add_scalar(SystemRef::POPULATED, self.populated, true);
        builder.add_scalar(SystemRef::NEEDS_PERMIT, self.needs_permit, false);
        builder.add_scalar(
            SystemRef::SECURITY,
            self.security.0,
            SecurityLevel::default().0,
        );
        builder.add_scalar(
            SystemRef::GOVERNMENT,
            self.government.0,
            Government::default().0,
        );
        builder.add_scalar(
            SystemRef::ALLEGIANCE,
            self.allegiance.0,
            Allegiance::default().0,
        );
        builder.end_table()
    }

    /// Builds a buffer whose root is this system.
    pub fn to_bytes(&self) -> Bytes {
        let mut builder = Builder::new();
        let root = self.pack(&mut builder);
        builder.finish(root, None);
        builder.into_bytes()
    }

    /// Builds a buffer with the given options. A buffer larger than
    /// `max_buffer_size` is an error.
    pub fn to_bytes_with_options(&self, options: BuilderOptions) -> Result<Bytes> {
        options.validate()?;
        let mut builder = Builder::with_options(options);
        let root = self.pack(&mut builder);
        builder.try_finish(root, None)?;
        Ok(builder.into_bytes())
    }

    pub fn facility(&self, facility_id: u32) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.facility_id == facility_id)
    }
}
