//! Build command implementation

use anyhow::{Context, Result};
use ettu_format::message::write_sealed;
use ettu_galaxy::{Galaxy, GalaxyRef};
use serde::Serialize;
use std::{fs::File, io::BufReader};

use crate::utils::{format_size, load_config, validate_file_exists};

#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub systems: usize,
    pub facilities: usize,
    pub commodities: usize,
    pub buffer_size: usize,
    pub distinct_vtables: usize,
}

/// Run the build command
pub fn run(input: String, output: String, config: Option<String>) -> Result<()> {
    let summary = build(&input, &output, config.as_deref())?;
    println!(
        "Wrote {} ({}): {} systems, {} facilities, {} commodities, {} distinct vtables",
        output,
        format_size(summary.buffer_size as u64),
        summary.systems,
        summary.facilities,
        summary.commodities,
        summary.distinct_vtables
    );
    Ok(())
}

/// Builds the galaxy described by `input` and writes it to `output` as a
/// sealed message. The buffer is verified before it is written.
pub fn build(input: &str, output: &str, config: Option<&str>) -> Result<BuildSummary> {
    let config = load_config(config)?;
    validate_file_exists(input)?;
    let file = File::open(input).with_context(|| format!("Failed to open {input}"))?;
    let galaxy: Galaxy = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse galaxy JSON from {input}"))?;
    log::info!(
        "building galaxy with {} systems from {}",
        galaxy.systems.len(),
        input
    );

    let buf = galaxy
        .to_bytes_with_options(config.builder)
        .context("Failed to build galaxy buffer")?;
    let reader = GalaxyRef::open_with_options(&buf, &config.verifier)
        .context("Built galaxy failed verification")?;
    let stats = reader.layout_stats()?;

    write_sealed(output, &buf).with_context(|| format!("Failed to write {output}"))?;
    Ok(BuildSummary {
        systems: galaxy.systems.len(),
        facilities: galaxy.systems.iter().map(|s| s.facilities.len()).sum(),
        commodities: galaxy.commodities.len(),
        buffer_size: buf.len(),
        distinct_vtables: stats.distinct_vtables,
    })
}
