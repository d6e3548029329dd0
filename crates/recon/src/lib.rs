//! Address reconciliation between the federal building registry (GWR) and
//! crowd-sourced OpenStreetMap data.
//!
//! The engine takes per-unit row sets, indexes both sides by a normalized
//! (name, house number) key, matches registry entries against crowd-sourced
//! candidates, and reports matches, missing addresses, field-level warnings
//! and per-unit / per-region / run-wide counters.
//!
//! Loading data from files and writing reports is the caller's job; this
//! crate only provides the CSV row decoding and the reconciliation itself.

pub mod config;
pub mod engine;
pub mod error;
pub mod geojson;
pub mod index;
pub mod matcher;
pub mod model;
pub mod registry;
pub mod stats;
pub mod survey;

pub use config::CompareConfig;
pub use engine::{run, run_unit, RunResult, UnitInput, UnitReport};
pub use error::CompareError;
pub use model::{Address, Warning};
pub use stats::Stats;
