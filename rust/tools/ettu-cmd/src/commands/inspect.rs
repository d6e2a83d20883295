//! Inspect command implementation

use anyhow::{Context, Result};
use ettu_format::options::VerifierOptions;
use ettu_galaxy::{FacilityRef, GalaxyRef, SystemRef};
use serde::Serialize;

use crate::utils::read_galaxy;

#[derive(Debug, Serialize)]
pub struct InspectSummary {
    pub file_size: u64,
    pub buffer_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub timestamp_utc: u64,
    pub commodity_count: usize,
    pub system_count: usize,
    pub facility_count: usize,
    pub table_count: usize,
    pub distinct_vtables: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data_size: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub systems: Vec<SystemInfo>,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub system_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub facility_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facilities: Vec<FacilityInfo>,
}

#[derive(Debug, Serialize)]
pub struct FacilityInfo {
    pub facility_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub features: u32,
    pub trading: bool,
}

/// Run the inspect command
pub fn run(verbose: u8, path: String) -> Result<()> {
    println!("Inspecting galaxy: {path}");
    let summary = inspect(&path, verbose)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub fn inspect(path: &str, verbose: u8) -> Result<InspectSummary> {
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {path}"))?
        .len();
    let payload = read_galaxy(path, &VerifierOptions::default())?;
    let galaxy = GalaxyRef::read_root(&payload)?;
    let stats = galaxy.layout_stats()?;

    let mut facility_count = 0;
    let mut systems = Vec::new();
    if let Some(all) = galaxy.systems()? {
        for system in all.iter() {
            let system = system?;
            facility_count += system.num_facilities()?;
            if verbose > 0 {
                systems.push(create_system_info(&system, verbose)?);
            }
        }
    }

    Ok(InspectSummary {
        file_size,
        buffer_size: payload.len(),
        schema_version: galaxy.schema_version()?.map(str::to_string),
        description: galaxy.description()?.map(str::to_string),
        attribution: galaxy.attribution()?.map(str::to_string),
        timestamp_utc: galaxy.timestamp_utc()?,
        commodity_count: galaxy.num_commodities()?,
        system_count: galaxy.num_systems()?,
        facility_count,
        table_count: stats.tables,
        distinct_vtables: stats.distinct_vtables,
        user_data_size: galaxy.user_data()?.map(<[u8]>::len),
        systems,
    })
}

fn create_system_info(system: &SystemRef, verbose: u8) -> Result<SystemInfo> {
    let mut facilities = Vec::new();
    if verbose > 1 {
        if let Some(all) = system.facilities()? {
            for facility in all.iter() {
                facilities.push(create_facility_info(&facility?)?);
            }
        }
    }
    Ok(SystemInfo {
        system_id: system.system_id()?,
        name: system.name()?.map(str::to_string),
        facility_count: system.num_facilities()?,
        facilities,
    })
}

fn create_facility_info(facility: &FacilityRef) -> Result<FacilityInfo> {
    Ok(FacilityInfo {
        facility_id: facility.facility_id()?,
        name: facility.name()?.map(str::to_string),
        features: facility.features()?.bits(),
        trading: facility.is_trading()?,
    })
}
