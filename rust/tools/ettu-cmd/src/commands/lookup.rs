//! Lookup command implementation

use anyhow::Result;
use ettu_format::options::VerifierOptions;
use ettu_galaxy::GalaxyRef;

use crate::utils::read_galaxy;

/// Run the lookup command
pub fn run(path: String, system_id: u32, facility_id: Option<u32>) -> Result<()> {
    let found = lookup(&path, system_id, facility_id)?;
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

/// Finds the system, or the facility within it, and returns it as JSON.
pub fn lookup(path: &str, system_id: u32, facility_id: Option<u32>) -> Result<serde_json::Value> {
    let payload = read_galaxy(path, &VerifierOptions::default())?;
    let galaxy = GalaxyRef::read_root(&payload)?;
    let Some(system) = galaxy.system_by_key(system_id)? else {
        anyhow::bail!("System {system_id} not found");
    };
    let value = match facility_id {
        Some(facility_id) => {
            let Some(facility) = system.facility_by_key(facility_id)? else {
                anyhow::bail!("Facility {facility_id} not found in system {system_id}");
            };
            serde_json::to_value(facility.unpack()?)?
        }
        None => serde_json::to_value(system.unpack()?)?,
    };
    log::debug!("found system {system_id} in {path}");
    Ok(value)
}
