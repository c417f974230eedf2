//! Duplicate detection and triage for citizen issue reports.
//!
//! The pure decision engine lives in [`core`]: average-hash fingerprints,
//! haversine distance, keyword categorisation, severity grading and the
//! first-match duplicate policy. [`services`] wires it to the label source
//! and report store collaborators.

pub mod config;
pub mod core;
pub mod services;

pub use config::{DuplicateConfig, EngineConfig};
