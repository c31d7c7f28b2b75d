//! `meteoprofiles` - atmospheric profile and timeseries charts
//!
//! This library retrieves radiosounding, radiometer and surface observations
//! through the data-warehouse retrieval command, reads ICON/AROME model
//! columns, reshapes everything into [`ProfileTable`]s and renders vertical
//! profiles, time-height heatmaps and timeseries charts.

pub mod cli;
pub mod commands;
pub mod config;
pub mod derivation;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod nwp;
pub mod plot;
pub mod retrieval;

// Re-export core types for public API
pub use commands::{MeteoService, OutputOptions, Source};
pub use config::MeteoConfig;
pub use error::{ErrorCode, MeteoError};
pub use models::{DataProduct, ProfileTable, Station, StationRegistry, TimeHeightGrid, TimeSeries, Variable};
pub use nwp::ModelKind;
pub use plot::ImageFormat;
pub use retrieval::{CommandRetriever, DwhRequest, DwhRetriever};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, MeteoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
