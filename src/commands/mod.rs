//! Chart commands
//!
//! Each command resolves its inputs against the configuration, loads one
//! table per requested source, derives and slices the requested variable and
//! renders a chart. [`MeteoService`] holds what the commands share.

pub mod profile;
pub mod timeheight;
pub mod timeseries;

use crate::config::{MeteoConfig, OutputConfig};
use crate::models::{DataProduct, ProfileTable, Station, StationRegistry, Variable};
use crate::nwp::{self, ModelKind};
use crate::plot::ImageFormat;
use crate::retrieval::{self, CommandRetriever, DwhRetriever};
use crate::MeteoError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use profile::{ProfileRequest, run_profile};
pub use timeheight::{TimeHeightRequest, run_time_height};
pub use timeseries::{TimeSeriesRequest, run_timeseries};

/// Where a table comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Radiosounding
    Rs,
    /// Microwave radiometer
    Mwr,
    /// Surface station
    Surface,
    /// ICON model file
    Icon,
    /// AROME model file
    Arome,
}

impl Source {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Source::Rs => "rs",
            Source::Mwr => "mwr",
            Source::Surface => "surface",
            Source::Icon => "icon",
            Source::Arome => "arome",
        }
    }

    /// Data-warehouse product for observation sources
    #[must_use]
    pub fn product(self) -> Option<DataProduct> {
        match self {
            Source::Rs => Some(DataProduct::Radiosounding),
            Source::Mwr => Some(DataProduct::Radiometer),
            Source::Surface => Some(DataProduct::Surface),
            Source::Icon | Source::Arome => None,
        }
    }

    #[must_use]
    pub fn model(self) -> Option<ModelKind> {
        match self {
            Source::Icon => Some(ModelKind::Icon),
            Source::Arome => Some(ModelKind::Arome),
            _ => None,
        }
    }

    /// Whether the source has more than one level
    #[must_use]
    pub fn is_profile(self) -> bool {
        self != Source::Surface
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Model files given on the command line
#[derive(Debug, Clone, Default)]
pub struct ModelFiles {
    pub icon: Option<PathBuf>,
    pub arome: Option<PathBuf>,
}

impl ModelFiles {
    fn path(&self, kind: ModelKind) -> Option<&Path> {
        match kind {
            ModelKind::Icon => self.icon.as_deref(),
            ModelKind::Arome => self.arome.as_deref(),
        }
    }
}

/// Chart output settings after command-line overrides
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    pub directory: PathBuf,
    pub format: ImageFormat,
    pub size: (u32, u32),
    /// Also write the charted data as CSV
    pub csv: bool,
}

impl OutputOptions {
    pub fn from_config(config: &OutputConfig) -> Result<Self, MeteoError> {
        Ok(Self {
            directory: PathBuf::from(&config.directory),
            format: config.format.parse()?,
            size: (config.width, config.height),
            csv: false,
        })
    }
}

/// Shared state of one command invocation
pub struct MeteoService {
    config: MeteoConfig,
    registry: StationRegistry,
    retriever: Box<dyn DwhRetriever>,
}

impl MeteoService {
    /// Service retrieving through the configured command
    #[must_use]
    pub fn new(config: MeteoConfig) -> Self {
        let retriever = Box::new(CommandRetriever::from_config(&config.retrieval));
        Self::with_retriever(config, retriever)
    }

    #[must_use]
    pub fn with_retriever(config: MeteoConfig, retriever: Box<dyn DwhRetriever>) -> Self {
        let registry = StationRegistry::new(&config.stations);
        Self {
            config,
            registry,
            retriever,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MeteoConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    /// Station by query, or the configured default station
    pub fn station(&self, query: Option<&str>) -> Result<&Station, MeteoError> {
        let query = query.unwrap_or(&self.config.defaults.station);
        self.registry.find(query)
    }

    /// Altitude bounds with configured defaults filling the gaps
    #[must_use]
    pub fn altitude_bounds(&self, lower: Option<f64>, upper: Option<f64>) -> (Option<f64>, Option<f64>) {
        (
            lower.or(self.config.defaults.lower_altitude_m),
            upper.or(self.config.defaults.upper_altitude_m),
        )
    }

    /// Load the table of one source for `[start, end]`
    pub async fn load_source(
        &self,
        source: Source,
        station: &Station,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        models: &ModelFiles,
    ) -> Result<ProfileTable> {
        if let Some(product) = source.product() {
            return retrieval::fetch_table(self.retriever.as_ref(), product, station, start, end)
                .await
                .with_context(|| format!("Failed to retrieve {source} data for {}", station.abbreviation));
        }

        let kind = source
            .model()
            .ok_or_else(|| MeteoError::validation(format!("{source} is not a model source")))?;
        let path = models.path(kind).ok_or_else(|| {
            MeteoError::validation(format!("{kind} source needs --{}-file", kind.tag()))
        })?;
        info!(model = %kind, file = %path.display(), "reading model file");
        let table = nwp::load_model_table(kind, path, station)
            .with_context(|| format!("Failed to read {kind} file {}", path.display()))?;

        let sliced = table.slice_time(start, end);
        debug!(rows = table.len(), in_window = sliced.len(), "model rows in time window");
        if sliced.is_empty() {
            return Err(MeteoError::no_data(format!(
                "{kind} file has no time steps between {start} and {end}"
            ))
            .into());
        }
        Ok(sliced)
    }
}

/// Derive `variable` if needed and keep rows inside the altitude bounds
pub fn prepare_table(
    mut table: ProfileTable,
    variable: Variable,
    lower: Option<f64>,
    upper: Option<f64>,
) -> Result<ProfileTable, MeteoError> {
    table.derive(variable)?;
    let sliced = table.slice_altitude(lower, upper)?;
    if sliced.is_empty() {
        return Err(MeteoError::no_data(format!(
            "no {} data between {} and {}",
            variable.label(),
            lower.map_or_else(|| "the lowest level".to_string(), |v| format!("{v} m")),
            upper.map_or_else(|| "the highest level".to_string(), |v| format!("{v} m")),
        )));
    }
    Ok(sliced)
}

/// Parse a UTC time given as `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM[:SS]`, `YYYYmmddHHMM` or `YYYY-MM-DD`
pub fn parse_time(input: &str) -> Result<DateTime<Utc>, MeteoError> {
    const FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y%m%d%H%M",
    ];
    let trimmed = input.trim().trim_end_matches('Z');
    FORMATS
        .iter()
        .find_map(|format| chrono::NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MeteoError::validation(format!("invalid time '{input}', expected e.g. 2024-07-01 12:00")))
}

/// Reject windows whose start is after their end
pub fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), MeteoError> {
    if start > end {
        return Err(MeteoError::validation(format!("start {start} is after end {end}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::DwhRequest;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rstest::rstest;

    struct NoRetrieval;

    #[async_trait]
    impl DwhRetriever for NoRetrieval {
        async fn retrieve(&self, _request: &DwhRequest) -> Result<String, MeteoError> {
            Err(MeteoError::retrieval("offline"))
        }
    }

    fn service() -> MeteoService {
        let mut config = MeteoConfig::default();
        config.defaults.lower_altitude_m = Some(400.0);
        MeteoService::with_retriever(config, Box::new(NoRetrieval))
    }

    #[rstest]
    #[case("2024-07-01 12:00")]
    #[case("2024-07-01T12:00")]
    #[case("2024-07-01T12:00:00Z")]
    #[case("202407011200")]
    fn test_parse_time(#[case] input: &str) {
        assert_eq!(parse_time(input).unwrap(), Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_only() {
        assert_eq!(parse_time("2024-07-01").unwrap(), Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
        assert!(parse_time("tomorrow").is_err());
    }

    #[test]
    fn test_default_station_and_bounds() {
        let service = service();
        assert_eq!(service.station(None).unwrap().abbreviation, "PAY");
        assert_eq!(service.station(Some("gve")).unwrap().abbreviation, "GVE");
        assert!(matches!(service.station(Some("XXX")), Err(MeteoError::UnknownStation(_))));
        assert_eq!(service.altitude_bounds(None, Some(5000.0)), (Some(400.0), Some(5000.0)));
        assert_eq!(service.altitude_bounds(Some(1000.0), None), (Some(1000.0), None));
    }

    #[test]
    fn test_source_mapping() {
        assert_eq!(Source::Mwr.product(), Some(DataProduct::Radiometer));
        assert_eq!(Source::Arome.model(), Some(ModelKind::Arome));
        assert_eq!(Source::Icon.product(), None);
        assert!(!Source::Surface.is_profile());
    }

    #[tokio::test]
    async fn test_model_source_needs_file() {
        let service = service();
        let station = service.station(None).unwrap().clone();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let err = service
            .load_source(Source::Icon, &station, now, now, &ModelFiles::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--icon-file"));
    }

    #[tokio::test]
    async fn test_retrieval_errors_carry_context() {
        let service = service();
        let station = service.station(None).unwrap().clone();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let err = service
            .load_source(Source::Rs, &station, now, now, &ModelFiles::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to retrieve rs data for PAY"));
        assert!(matches!(err.downcast_ref::<MeteoError>(), Some(MeteoError::Retrieval { .. })));
    }

    #[test]
    fn test_prepare_table_derives_and_slices() {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let mut table = ProfileTable::new();
        for (altitude, u, v) in [(500.0, 3.0, 4.0), (1500.0, 0.0, 2.0)] {
            table.push_row(now, altitude, &[(Variable::WindU, Some(u)), (Variable::WindV, Some(v))]);
        }
        let prepared = prepare_table(table.clone(), Variable::WindSpeed, None, Some(1000.0)).unwrap();
        assert_eq!(prepared.profile_at(now, Variable::WindSpeed), vec![(500.0, 5.0)]);

        let err = prepare_table(table, Variable::WindSpeed, Some(3000.0), None).unwrap_err();
        assert!(matches!(err, MeteoError::NoData { .. }));
    }

    #[test]
    fn test_check_window() {
        let a = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap();
        assert!(check_window(a, b).is_ok());
        assert!(check_window(b, a).is_err());
    }
}
