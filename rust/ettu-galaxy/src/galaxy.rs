//! The galaxy catalog: root table of a galaxy buffer.

use ahash::AHashSet;
use ettu_bytes::Bytes;
use ettu_common::{Result, error::Error};
use ettu_format::{
    Builder, FieldId, Offset, Table, TableMut, TableRef, Vector, buffer_has_identifier,
    options::{BuilderOptions, VerifierOptions},
    root_table,
    sorted::lookup_by_key,
    verifier::{Verifier, Verify},
};
use serde::{Deserialize, Serialize};

use crate::{
    Commodity, CommodityRef, FILE_IDENTIFIER, SCHEMA_VERSION, System, SystemMut, SystemRef,
    open_verified, to_owned_str,
};

/// Reader for the root galaxy table.
#[derive(Clone, Copy)]
pub struct GalaxyRef<'a>(Table<'a>);

ettu_format::table_ref!(GalaxyRef);

impl<'a> GalaxyRef<'a> {
    pub const SCHEMA_VERSION: FieldId = 0;
    pub const DESCRIPTION: FieldId = 1;
    pub const ATTRIBUTION: FieldId = 2;
    pub const TIMESTAMP_UTC: FieldId = 3;
    pub const COMMODITIES: FieldId = 4;
    pub const SYSTEMS: FieldId = 5;
    pub const USER_DATA: FieldId = 6;
    pub const INI_DATA: FieldId = 7;
    pub const JSON_DATA: FieldId = 8;
    pub const YAML_DATA: FieldId = 9;
    pub const FIELD_COUNT: FieldId = 10;

    /// Verifies `buf`, including its file identifier, and opens the galaxy.
    pub fn open(buf: &'a [u8]) -> Result<GalaxyRef<'a>> {
        Self::open_with_options(buf, &VerifierOptions::default())
    }

    pub fn open_with_options(buf: &'a [u8], options: &VerifierOptions) -> Result<GalaxyRef<'a>> {
        open_verified(buf, options, Some(FILE_IDENTIFIER))
    }

    /// Opens the galaxy without walking the buffer. Only the file identifier
    /// and the root table header are checked.
    pub fn read_root(buf: &'a [u8]) -> Result<GalaxyRef<'a>> {
        if !buffer_has_identifier(buf, FILE_IDENTIFIER) {
            return Err(Error::invalid_format(
                "file identifier",
                "not a galaxy buffer",
            ));
        }
        root_table(buf).map(GalaxyRef)
    }

    pub fn schema_version(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::SCHEMA_VERSION)
    }

    pub fn description(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::DESCRIPTION)
    }

    pub fn attribution(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::ATTRIBUTION)
    }

    pub fn timestamp_utc(&self) -> Result<u64> {
        self.0.get(Self::TIMESTAMP_UTC, 0)
    }

    /// Commodities, ordered by `commodity_id`.
    pub fn commodities(&self) -> Result<Option<Vector<'a, CommodityRef<'a>>>> {
        self.0.get_vector(Self::COMMODITIES)
    }

    /// Systems, ordered by `system_id`.
    pub fn systems(&self) -> Result<Option<Vector<'a, SystemRef<'a>>>> {
        self.0.get_vector(Self::SYSTEMS)
    }

    /// Opaque application bytes carried along with the catalog.
    pub fn user_data(&self) -> Result<Option<&'a [u8]>> {
        self.0.get_bytes(Self::USER_DATA)
    }

    /// Settings blobs kept verbatim, one per source format.
    pub fn ini_data(&self) -> Result<Option<&'a [u8]>> {
        self.0.get_bytes(Self::INI_DATA)
    }

    pub fn json_data(&self) -> Result<Option<&'a [u8]>> {
        self.0.get_bytes(Self::JSON_DATA)
    }

    pub fn yaml_data(&self) -> Result<Option<&'a [u8]>> {
        self.0.get_bytes(Self::YAML_DATA)
    }

    pub fn num_systems(&self) -> Result<usize> {
        Ok(self.systems()?.map_or(0, |v| v.len()))
    }

    pub fn num_commodities(&self) -> Result<usize> {
        Ok(self.commodities()?.map_or(0, |v| v.len()))
    }

    pub fn system_by_key(&self, system_id: u32) -> Result<Option<SystemRef<'a>>> {
        match self.systems()? {
            Some(systems) => lookup_by_key(&systems, &system_id, |s| s.system_id()),
            None => Ok(None),
        }
    }

    pub fn commodity_by_key(&self, commodity_id: u32) -> Result<Option<CommodityRef<'a>>> {
        match self.commodities()? {
            Some(commodities) => lookup_by_key(&commodities, &commodity_id, |c| c.commodity_id()),
            None => Ok(None),
        }
    }

    /// Counts the tables reachable from the root and the distinct vtables
    /// they use.
    pub fn layout_stats(&self) -> Result<LayoutStats> {
        let mut walk = LayoutWalk::default();
        walk.visit(self.0);
        if let Some(commodities) = self.commodities()? {
            for commodity in commodities.iter() {
                walk.visit(commodity?.table());
            }
        }
        if let Some(systems) = self.systems()? {
            for system in systems.iter() {
                let system = system?;
                walk.visit(system.table());
                let Some(facilities) = system.facilities()? else {
                    continue;
                };
                for facility in facilities.iter() {
                    let facility = facility?;
                    walk.visit(facility.table());
                    if let Some(listing) = facility.listing()? {
                        walk.visit(listing.table());
                    }
                }
            }
        }
        Ok(walk.finish(self.0.buffer().len()))
    }

    pub fn unpack(&self) -> Result<Galaxy> {
        let commodities = match self.commodities()? {
            Some(commodities) => commodities
                .iter()
                .map(|c| c.and_then(|c| c.unpack()))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        let systems = match self.systems()? {
            Some(systems) => systems
                .iter()
                .map(|s| s.and_then(|s| s.unpack()))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Galaxy {
            schema_version: to_owned_str(self.schema_version()?),
            description: to_owned_str(self.description()?),
            attribution: to_owned_str(self.attribution()?),
            timestamp_utc: self.timestamp_utc()?,
            commodities,
            systems,
            user_data: self.user_data()?.map(<[u8]>::to_vec).unwrap_or_default(),
            ini_data: self.ini_data()?.map(<[u8]>::to_vec).unwrap_or_default(),
            json_data: self.json_data()?.map(<[u8]>::to_vec).unwrap_or_default(),
            yaml_data: self.yaml_data()?.map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }
}

impl<'a> Verify<'a> for GalaxyRef<'a> {
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> Result<()> {
        v.verify_string(table, Self::SCHEMA_VERSION)?;
        v.verify_string(table, Self::DESCRIPTION)?;
        v.verify_string(table, Self::ATTRIBUTION)?;
        v.verify_scalar::<u64>(table, Self::TIMESTAMP_UTC)?;
        v.verify_vector_of_tables::<CommodityRef>(table, Self::COMMODITIES)?;
        v.verify_vector_of_tables::<SystemRef>(table, Self::SYSTEMS)?;
        v.verify_byte_vector(table, Self::USER_DATA)?;
        v.verify_byte_vector(table, Self::INI_DATA)?;
        v.verify_byte_vector(table, Self::JSON_DATA)?;
        v.verify_byte_vector(table, Self::YAML_DATA)
    }
}

impl std::fmt::Debug for GalaxyRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalaxyRef")
            .field("description", &self.description().ok().flatten())
            .field("systems", &self.num_systems().ok())
            .finish()
    }
}

/// Shape summary of a galaxy buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutStats {
    pub buffer_size: usize,
    pub tables: usize,
    pub distinct_vtables: usize,
}

#[derive(Default)]
struct LayoutWalk {
    tables: usize,
    vtables: AHashSet<usize>,
}

impl LayoutWalk {
    fn visit(&mut self, table: Table) {
        self.tables += 1;
        self.vtables.insert(table.vtable().position());
    }

    fn finish(self, buffer_size: usize) -> LayoutStats {
        LayoutStats {
            buffer_size,
            tables: self.tables,
            distinct_vtables: self.vtables.len(),
        }
    }
}

/// In-place editor for a galaxy buffer.
pub struct GalaxyMut<'a>(TableMut<'a>);

impl<'a> GalaxyMut<'a> {
    pub fn root(buf: &'a mut [u8]) -> Result<GalaxyMut<'a>> {
        if !buffer_has_identifier(buf, FILE_IDENTIFIER) {
            return Err(Error::invalid_format(
                "file identifier",
                "not a galaxy buffer",
            ));
        }
        TableMut::root(buf).map(GalaxyMut)
    }

    pub fn reader(&self) -> Result<GalaxyRef<'_>> {
        Ok(GalaxyRef(self.0.as_table()?))
    }

    pub fn set_timestamp_utc(&mut self, timestamp: u64) -> Result<bool> {
        self.0.set(GalaxyRef::TIMESTAMP_UTC, timestamp)
    }

    /// Editor for the system with the given id.
    pub fn system_mut_by_key(&mut self, system_id: u32) -> Result<Option<SystemMut<'_>>> {
        let found = self.reader()?.system_by_key(system_id)?;
        let Some(pos) = found.map(|s| s.table().position()) else {
            return Ok(None);
        };
        Ok(Some(SystemMut::new(self.0.table_at(pos)?)))
    }
}

/// Owned galaxy catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Galaxy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub timestamp_utc: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commodities: Vec<Commodity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub systems: Vec<System>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_data: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ini_data: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub json_data: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub yaml_data: Vec<u8>,
}

impl Galaxy {
    pub fn new(description: impl Into<String>) -> Galaxy {
        Galaxy {
            schema_version: Some(SCHEMA_VERSION.to_string()),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// Writes the galaxy with commodities and systems sorted by key.
    pub fn pack(&self, builder: &mut Builder) -> Offset<Galaxy> {
        let schema_version = self
            .schema_version
            .as_deref()
            .map(|s| builder.create_string(s));
        let description = self.description.as_deref().map(|s| builder.create_string(s));
        let attribution = self.attribution.as_deref().map(|s| builder.create_string(s));
        let mut blob = |bytes: &[u8]| {
            (!bytes.is_empty()).then(|| builder.create_byte_vector(bytes))
        };
        let user_data = blob(&self.user_data);
        let ini_data = blob(&self.ini_data);
        let json_data = blob(&self.json_data);
        let yaml_data = blob(&self.yaml_data);
        let commodities = if self.commodities.is_empty() {
            None
        } else {
            let mut offsets = self
                .commodities
                .iter()
                .map(|c| c.pack(builder))
                .collect::<Vec<_>>();
            Some(builder.create_sorted_vector_of_tables(
                &mut offsets,
                CommodityRef::COMMODITY_ID,
                0u32,
            ))
        };
        let systems = if self.systems.is_empty() {
            None
        } else {
            let mut offsets = self
                .systems
                .iter()
                .map(|s| s.pack(builder))
                .collect::<Vec<_>>();
            Some(builder.create_sorted_vector_of_tables(&mut offsets, SystemRef::SYSTEM_ID, 0u32))
        };

        builder.start_table(GalaxyRef::FIELD_COUNT);
        builder.add_scalar(GalaxyRef::TIMESTAMP_UTC, self.timestamp_utc, 0);
        builder.add_offset_opt(GalaxyRef::SCHEMA_VERSION, schema_version);
        builder.add_offset_opt(GalaxyRef::DESCRIPTION, description);
        builder.add_offset_opt(GalaxyRef::ATTRIBUTION, attribution);
        builder.add_offset_opt(GalaxyRef::COMMODITIES, commodities);
        builder.add_offset_opt(GalaxyRef::SYSTEMS, systems);
        builder.add_offset_opt(GalaxyRef::USER_DATA, user_data);
        builder.add_offset_opt(GalaxyRef::INI_DATA, ini_data);
        builder.add_offset_opt(GalaxyRef::JSON_DATA, json_data);
        builder.add_offset_opt(GalaxyRef::YAML_DATA, yaml_data);
        builder.end_table()
    }

    /// Builds a galaxy buffer carrying the `gomd` file identifier.
    ///
    /// # Panics
    ///
    /// Panics if the galaxy does not fit in the format's 2 GiB limit.
    pub fn to_bytes(&self) -> Bytes {
        let mut builder = Builder::new();
        let root = self.pack(&mut builder);
        builder.finish(root, Some(FILE_IDENTIFIER));
        builder.into_bytes()
    }

    /// Builds a galaxy buffer with the given options. A buffer larger than
    /// `max_buffer_size` is an error.
    pub fn to_bytes_with_options(&self, options: BuilderOptions) -> Result<Bytes> {
        options.validate()?;
        let mut builder = Builder::with_options(options);
        let root = self.pack(&mut builder);
        builder.try_finish(root, Some(FILE_IDENTIFIER))?;
        let stats = builder.stats();
        log::debug!(
            "built galaxy: {} systems, {} commodities, {} tables, {} shared strings reused",
            self.systems.len(),
            self.commodities.len(),
            stats.tables,
            stats.shared_strings_reused
        );
        Ok(builder.into_bytes())
    }

    pub fn system(&self, system_id: u32) -> Option<&System> {
        self.systems.iter().find(|s| s.system_id == system_id)
    }

    pub fn commodity(&self, commodity_id: u32) -> Option<&Commodity> {
        self.commodities
            .iter()
            .find(|c| c.commodity_id == commodity_id)
    }
}
