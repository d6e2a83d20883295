//! Test utilities for the Ettu crates.
//!
//! Provides deterministic generation of synthetic galaxies (systems,
//! facilities, market listings, commodities) for tests and tools. Every
//! generator takes a seed, so a failing case can be reproduced.

pub mod data_gen;
