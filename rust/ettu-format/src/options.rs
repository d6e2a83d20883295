//! Builder and verifier configuration.

use ettu_common::{Result, verify_arg};
use serde::{Deserialize, Serialize};

use crate::MAX_BUFFER_SIZE;

/// Configuration for [`Builder`](crate::builder::Builder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Bytes reserved up front for the buffer under construction.
    pub initial_capacity: usize,
    /// Write scalar fields even when they equal their declared default.
    pub force_defaults: bool,
    /// Share structurally identical vtables between tables.
    pub dedup_vtables: bool,
    /// Largest buffer the builder may produce.
    pub max_buffer_size: usize,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            force_defaults: false,
            dedup_vtables: true,
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl BuilderOptions {
    pub fn validate(&self) -> Result<()> {
        verify_arg!(max_buffer_size, self.max_buffer_size <= MAX_BUFFER_SIZE);
        verify_arg!(
            initial_capacity,
            self.initial_capacity <= self.max_buffer_size
        );
        Ok(())
    }
}

/// Limits applied by [`Verifier`](crate::verifier::Verifier) when checking a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierOptions {
    /// Maximum nesting depth of tables.
    pub max_depth: usize,
    /// Maximum number of tables visited.
    pub max_tables: usize,
    /// Maximum total number of bytes covered by visited objects. Shared
    /// objects count once per reference.
    pub max_apparent_size: usize,
    /// Require scalars, offsets and tables to sit at naturally aligned positions.
    pub check_alignment: bool,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_tables: 1_000_000,
            max_apparent_size: 1 << 30,
            check_alignment: true,
        }
    }
}

impl VerifierOptions {
    pub fn validate(&self) -> Result<()> {
        verify_arg!(max_depth, self.max_depth > 0);
        verify_arg!(max_tables, self.max_tables > 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        BuilderOptions::default().validate().unwrap();
        VerifierOptions::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_options() {
        let options = BuilderOptions {
            initial_capacity: 100,
            max_buffer_size: 10,
            ..Default::default()
        };
        assert!(options.validate().is_err());
        let options = VerifierOptions {
            max_depth: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: BuilderOptions = serde_json::from_str(r#"{"force_defaults": true}"#).unwrap();
        assert!(options.force_defaults);
        assert!(options.dedup_vtables);
        assert_eq!(options.initial_capacity, 1024);
    }
}
