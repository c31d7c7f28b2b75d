//! Command-line interface

use crate::commands::profile::DEFAULT_WINDOW_HOURS;
use crate::commands::{
    self, MeteoService, ModelFiles, OutputOptions, ProfileRequest, Source, TimeHeightRequest, TimeSeriesRequest,
};
use crate::config::MeteoConfig;
use crate::models::Variable;
use crate::plot::ImageFormat;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "meteoprofiles", version, about = "Atmospheric profile and timeseries charts for measurement stations")]
pub struct Cli {
    /// Configuration file (default: <config dir>/meteoprofiles/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging and full error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory charts are written to
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Image format: png or svg
    #[arg(short, long, global = true)]
    pub format: Option<ImageFormat>,

    /// Also write the charted data as CSV next to the image
    #[arg(long, global = true)]
    pub csv: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Vertical profiles of one or more sources nearest to a time
    Profile(ProfileArgs),
    /// Time-height heatmap of a profiling source
    TimeHeight(TimeHeightArgs),
    /// Timeseries of surface data or of one level of profile sources
    Timeseries(TimeSeriesArgs),
    /// List known stations
    Stations {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct ModelFileArgs {
    /// ICON NetCDF file for the icon source
    #[arg(long)]
    pub icon_file: Option<PathBuf>,

    /// AROME NetCDF file for the arome source
    #[arg(long)]
    pub arome_file: Option<PathBuf>,
}

impl From<ModelFileArgs> for ModelFiles {
    fn from(args: ModelFileArgs) -> Self {
        Self {
            icon: args.icon_file,
            arome: args.arome_file,
        }
    }
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Station abbreviation, name or WMO id
    #[arg(short, long)]
    pub station: Option<String>,

    /// Time of the profile (UTC), e.g. "2024-07-01 12:00"
    #[arg(short, long, value_parser = commands::parse_time)]
    pub time: DateTime<Utc>,

    /// Variable to plot, e.g. temperature, rh, theta, wind_speed
    #[arg(long)]
    pub variable: Variable,

    /// Comma separated sources
    #[arg(long = "sources", value_enum, value_delimiter = ',', default_value = "rs")]
    pub sources: Vec<Source>,

    /// Lower altitude bound in m a.s.l.
    #[arg(long)]
    pub lower: Option<f64>,

    /// Upper altitude bound in m a.s.l.
    #[arg(long)]
    pub upper: Option<f64>,

    /// Hours around --time searched for a profile
    #[arg(long, default_value_t = DEFAULT_WINDOW_HOURS)]
    pub window_hours: u32,

    #[command(flatten)]
    pub models: ModelFileArgs,
}

#[derive(Debug, Args)]
pub struct TimeHeightArgs {
    #[arg(short, long)]
    pub station: Option<String>,

    /// Start of the window (UTC)
    #[arg(long, value_parser = commands::parse_time)]
    pub start: DateTime<Utc>,

    /// End of the window (UTC)
    #[arg(long, value_parser = commands::parse_time)]
    pub end: DateTime<Utc>,

    #[arg(long)]
    pub variable: Variable,

    /// mwr, icon or arome
    #[arg(long, value_enum, default_value = "mwr")]
    pub source: Source,

    #[arg(long)]
    pub lower: Option<f64>,

    #[arg(long)]
    pub upper: Option<f64>,

    #[command(flatten)]
    pub models: ModelFileArgs,
}

#[derive(Debug, Args)]
pub struct TimeSeriesArgs {
    #[arg(short, long)]
    pub station: Option<String>,

    #[arg(long, value_parser = commands::parse_time)]
    pub start: DateTime<Utc>,

    #[arg(long, value_parser = commands::parse_time)]
    pub end: DateTime<Utc>,

    #[arg(long)]
    pub variable: Variable,

    #[arg(long = "sources", value_enum, value_delimiter = ',', default_value = "surface")]
    pub sources: Vec<Source>,

    /// Level read from profile sources, in m a.s.l.
    #[arg(long)]
    pub altitude: Option<f64>,

    #[command(flatten)]
    pub models: ModelFileArgs,
}

impl Cli {
    /// Output options from configuration with command-line overrides applied
    pub fn output_options(&self, config: &MeteoConfig) -> Result<OutputOptions> {
        let mut options = OutputOptions::from_config(&config.output)?;
        if let Some(dir) = &self.output_dir {
            options.directory.clone_from(dir);
        }
        if let Some(format) = self.format {
            options.format = format;
        }
        options.csv = self.csv;
        Ok(options)
    }
}

/// Execute the parsed command line against a loaded configuration
pub async fn run(cli: Cli, config: MeteoConfig) -> Result<()> {
    let output = cli.output_options(&config)?;
    let service = MeteoService::new(config);

    let written = match cli.command {
        Commands::Profile(args) => {
            let request = ProfileRequest {
                station: args.station,
                time: args.time,
                variable: args.variable,
                sources: args.sources,
                lower_altitude_m: args.lower,
                upper_altitude_m: args.upper,
                window_hours: args.window_hours,
                models: args.models.into(),
            };
            commands::run_profile(&service, &request, &output).await?
        }
        Commands::TimeHeight(args) => {
            let request = TimeHeightRequest {
                station: args.station,
                start: args.start,
                end: args.end,
                variable: args.variable,
                source: args.source,
                lower_altitude_m: args.lower,
                upper_altitude_m: args.upper,
                models: args.models.into(),
            };
            commands::run_time_height(&service, &request, &output).await?
        }
        Commands::Timeseries(args) => {
            let request = TimeSeriesRequest {
                station: args.station,
                start: args.start,
                end: args.end,
                variable: args.variable,
                sources: args.sources,
                altitude_m: args.altitude,
                models: args.models.into(),
            };
            commands::run_timeseries(&service, &request, &output).await?
        }
        Commands::Stations { json } => {
            print_stations(&service, json)?;
            return Ok(());
        }
    };

    info!("chart written");
    println!("{}", written.display());
    Ok(())
}

fn print_stations(service: &MeteoService, json: bool) -> Result<()> {
    let stations = service.registry().all();
    if json {
        let text = serde_json::to_string_pretty(stations).context("Failed to serialize stations")?;
        println!("{text}");
        return Ok(());
    }
    for station in stations {
        println!(
            "{:<5} {:<7} {:<24} {}  {:.0} m",
            station.abbreviation,
            station.wmo_id.as_deref().unwrap_or("-"),
            station.name,
            station.format_coordinates(),
            station.altitude_m
        );
    }
    Ok(())
}
