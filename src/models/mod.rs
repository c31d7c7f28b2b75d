//! Data models for the meteoprofiles application
//!
//! This module contains the core domain models organized by concern:
//! - Station: measurement sites and the lookup registry
//! - Variable: meteorological quantities and the data products carrying them
//! - Table: tabular profile data and its time-height and timeseries views

pub mod station;
pub mod table;
pub mod variable;

// Re-export all public types for convenient access
pub use station::{Station, StationRegistry};
pub use table::{ProfileTable, TimeHeightGrid, TimeSeries};
pub use variable::{DataProduct, Variable};
