//! Common utilities for ettu-cmd

use anyhow::{Context, Result};
use ettu_bytes::Bytes;
use ettu_format::{message::read_sealed, options::VerifierOptions};
use ettu_galaxy::GalaxyRef;
use std::path::Path;

use crate::commands::CmdConfig;

/// Checks if a file exists and is readable
pub fn validate_file_exists(path: &str) -> Result<()> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }
    if !file_path.is_file() {
        anyhow::bail!("Path is not a file: {}", path);
    }
    Ok(())
}

/// Formats file size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Loads the optional `--config` file.
pub fn load_config(path: Option<&str>) -> Result<CmdConfig> {
    let Some(path) = path else {
        return Ok(CmdConfig::default());
    };
    validate_file_exists(path)?;
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {path}"))?;
    let config: CmdConfig =
        serde_json::from_str(&text).with_context(|| format!("Invalid config {path}"))?;
    config.builder.validate().context("Invalid builder options")?;
    config
        .verifier
        .validate()
        .context("Invalid verifier options")?;
    Ok(config)
}

/// Reads a sealed galaxy file and returns its verified payload.
pub fn read_galaxy(path: &str, options: &VerifierOptions) -> Result<Bytes> {
    validate_file_exists(path)?;
    let payload = read_sealed(path).with_context(|| format!("Failed to read {path}"))?;
    GalaxyRef::open_with_options(&payload, options)
        .with_context(|| format!("{path} is not a valid galaxy buffer"))?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_missing_file() {
        assert!(validate_file_exists("/nonexistent/galaxy.bin").is_err());
        assert!(load_config(Some("/nonexistent/options.json")).is_err());
        assert!(load_config(None).is_ok());
    }
}
