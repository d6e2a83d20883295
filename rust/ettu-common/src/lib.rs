//! Core definitions (errors, result type and checking macros), relied upon by all ettu-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use result::Result;
