//! Command implementations for ettu-cmd

use ettu_format::options::{BuilderOptions, VerifierOptions};
use serde::{Deserialize, Serialize};

pub mod build;
pub mod inspect;
pub mod lookup;

/// Contents of the `--config` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CmdConfig {
    pub builder: BuilderOptions,
    pub verifier: VerifierOptions,
}
