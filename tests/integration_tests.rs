//! End-to-end tests of the retrieval, reshaping and chart preparation pipeline
//! with a canned retrieval backend.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use meteoprofiles::commands::profile::DEFAULT_WINDOW_HOURS;
use meteoprofiles::commands::timeseries::series_for_source;
use meteoprofiles::commands::{
    self, ModelFiles, ProfileRequest, TimeHeightRequest, TimeSeriesRequest, prepare_table,
};
use meteoprofiles::plot::{TimeHeightChart, TimeSeriesChart};
use meteoprofiles::retrieval::fetch_table;
use meteoprofiles::{
    DataProduct, DwhRequest, DwhRetriever, ImageFormat, MeteoConfig, MeteoError, MeteoService, OutputOptions,
    Source, StationRegistry, Variable,
};
use std::path::PathBuf;
use std::sync::Mutex;

const SOUNDING: &str = "\
station|termin|level|744|745|746|747|743|748
PAY|20240701110000|491|957.0|24.0|50|12.9|200|2.0
PAY|20240701110000|1000|900.0|20.0|55|10.7|225|6.0
PAY|20240701110000|2000|800.0|13.0|60|5.4|250|10.0
PAY|20240701110000|3000|705.0|6.0|-9999|-9999|270|14.0
";

const RADIOMETER: &str = "\
# profile_mwr PAY
station|termin|level|3147|3148
PAY|20240701000000|491|16.0|80
PAY|20240701000000|1000|13.0|85
PAY|20240701000000|2000|7.0|70
PAY|20240701060000|491|15.0|88
PAY|20240701060000|1000|12.5|90
PAY|20240701060000|2000|6.5|-9999
PAY|20240701120000|491|25.0|45
PAY|20240701120000|1000|20.0|50
PAY|20240701120000|2000|13.0|55
";

const SURFACE: &str = "\
station|termin|tre200s0|ure200s0|fkl010z0|dkl010z0
PAY|202407010000|16.1|81|1.2|40
PAY|202407010010|15.9|-|1.0|35
PAY|202407010020|15.8|83|0.8|30
";

/// Retriever answering from canned outputs and recording every request
#[derive(Default)]
struct CannedRetriever {
    requests: Mutex<Vec<DwhRequest>>,
}

#[async_trait]
impl DwhRetriever for CannedRetriever {
    async fn retrieve(&self, request: &DwhRequest) -> Result<String, MeteoError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(match request.product {
            DataProduct::Radiosounding => SOUNDING,
            DataProduct::Radiometer => RADIOMETER,
            DataProduct::Surface => SURFACE,
        }
        .to_string())
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, hour, 0, 0).unwrap()
}

fn payerne() -> meteoprofiles::Station {
    StationRegistry::default().find("Payerne").unwrap().clone()
}

#[tokio::test]
async fn test_sounding_to_profile() {
    let retriever = CannedRetriever::default();
    let station = payerne();
    let table = fetch_table(&retriever, DataProduct::Radiosounding, &station, at(5), at(17))
        .await
        .unwrap();

    let request = &retriever.requests.lock().unwrap()[0];
    assert_eq!(request.station, "PAY");
    assert_eq!(request.parameters, vec!["744", "745", "746", "747", "743", "748"]);

    let prepared = prepare_table(table, Variable::PotentialTemperature, Some(900.0), Some(2500.0)).unwrap();
    let time = prepared.nearest_time(at(12)).unwrap();
    assert_eq!(time, at(11));

    let theta = prepared.profile_at(time, Variable::PotentialTemperature);
    assert_eq!(theta.len(), 2);
    assert_eq!(theta[0].0, 1000.0);
    // Potential temperature increases with height in a stable layer
    assert!(theta[1].1 > theta[0].1);
}

#[tokio::test]
async fn test_sounding_wind_components() {
    let retriever = CannedRetriever::default();
    let mut table = fetch_table(&retriever, DataProduct::Radiosounding, &payerne(), at(5), at(17))
        .await
        .unwrap();
    table.derive(Variable::WindU).unwrap();
    table.derive(Variable::WindV).unwrap();

    // 14 m/s from the west at 3000 m
    let u = table.profile_at(at(11), Variable::WindU);
    let v = table.profile_at(at(11), Variable::WindV);
    assert!((u[3].1 - 14.0).abs() < 1e-9);
    assert!(v[3].1.abs() < 1e-9);
}

#[tokio::test]
async fn test_radiometer_time_height() {
    let retriever = CannedRetriever::default();
    let table = fetch_table(&retriever, DataProduct::Radiometer, &payerne(), at(0), at(23))
        .await
        .unwrap();
    let prepared = prepare_table(table, Variable::RelativeHumidity, None, Some(1500.0)).unwrap();
    let grid = prepared.to_time_height(Variable::RelativeHumidity).unwrap();

    assert_eq!(grid.times, vec![at(0), at(6), at(12)]);
    assert_eq!(grid.altitudes, vec![491.0, 1000.0]);
    assert_eq!(grid.cell(1, 1), Some(90.0));

    let chart = TimeHeightChart::new("PAY MWR rh", grid).unwrap();
    assert_eq!(chart.cells().len(), 6);
    assert_eq!((chart.scale().min(), chart.scale().max()), (45.0, 90.0));
}

#[tokio::test]
async fn test_surface_and_radiometer_timeseries() {
    let retriever = CannedRetriever::default();
    let station = payerne();
    let surface = fetch_table(&retriever, DataProduct::Surface, &station, at(0), at(1))
        .await
        .unwrap();
    let radiometer = fetch_table(&retriever, DataProduct::Radiometer, &station, at(0), at(23))
        .await
        .unwrap();

    let humidity = series_for_source(Source::Surface, "PAY", &surface, Variable::RelativeHumidity, None);
    assert_eq!(humidity.points.len(), 3);
    assert_eq!(humidity.points[1].1, None);

    let aloft = series_for_source(Source::Mwr, "PAY", &radiometer, Variable::Temperature, Some(1100.0));
    assert_eq!(
        aloft.points,
        vec![(at(0), Some(13.0)), (at(6), Some(12.5)), (at(12), Some(20.0))]
    );

    let mut chart = TimeSeriesChart::new("PAY temperature", Variable::Temperature);
    chart.push(series_for_source(Source::Surface, "PAY", &surface, Variable::Temperature, None));
    chart.push(aloft);
    assert_eq!(chart.time_axis(), (0.0, 12.0));
    assert_eq!(chart.segments(0).len(), 1);
}

#[tokio::test]
async fn test_underivable_variable_is_no_data() {
    let retriever = CannedRetriever::default();
    let table = fetch_table(&retriever, DataProduct::Radiometer, &payerne(), at(0), at(23))
        .await
        .unwrap();
    let err = prepare_table(table, Variable::WindSpeed, None, None).unwrap_err();
    assert!(matches!(err, MeteoError::NoData { .. }));
}

fn service() -> MeteoService {
    MeteoService::with_retriever(MeteoConfig::default(), Box::new(CannedRetriever::default()))
}

/// SVG output with CSV side files into a fresh per-test directory
fn output(name: &str) -> OutputOptions {
    let directory = std::env::temp_dir().join(format!("meteoprofiles-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&directory);
    OutputOptions {
        directory,
        format: ImageFormat::Svg,
        size: (800, 600),
        csv: true,
    }
}

fn read_csv(output: &OutputOptions, stem: &str) -> Vec<String> {
    std::fs::read_to_string(output.directory.join(format!("{stem}.csv")))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn file_name(path: &std::path::Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap()
}

#[tokio::test]
async fn test_profile_command_writes_chart_and_csv() {
    let output = output("profile");
    let request = ProfileRequest {
        station: Some("PAY".to_string()),
        time: at(12),
        variable: Variable::RelativeHumidity,
        sources: vec![Source::Rs, Source::Mwr, Source::Rs],
        lower_altitude_m: None,
        upper_altitude_m: None,
        window_hours: DEFAULT_WINDOW_HOURS,
        models: ModelFiles::default(),
    };
    let path = commands::run_profile(&service(), &request, &output).await.unwrap();

    assert_eq!(file_name(&path), "PAY_profile_rh_202407011200.svg");
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    let sounding = read_csv(&output, "PAY_profile_rh_202407011200_rs");
    assert_eq!(
        sounding,
        vec![
            "time,altitude,rh",
            "2024-07-01T11:00:00Z,491.0,50.000",
            "2024-07-01T11:00:00Z,1000.0,55.000",
            "2024-07-01T11:00:00Z,2000.0,60.000",
            "2024-07-01T11:00:00Z,3000.0,",
        ]
    );
    let radiometer = read_csv(&output, "PAY_profile_rh_202407011200_mwr");
    assert_eq!(radiometer.len(), 4);
    assert_eq!(radiometer[2], "2024-07-01T12:00:00Z,1000.0,50.000");
}

#[tokio::test]
async fn test_time_height_command_writes_chart_and_csv() {
    let output = output("timeheight");
    let request = TimeHeightRequest {
        station: None,
        start: at(0),
        end: at(23),
        variable: Variable::Temperature,
        source: Source::Mwr,
        lower_altitude_m: Some(900.0),
        upper_altitude_m: None,
        models: ModelFiles::default(),
    };
    let path = commands::run_time_height(&service(), &request, &output).await.unwrap();

    assert_eq!(file_name(&path), "PAY_timeheight_mwr_temperature_202407010000.svg");
    assert!(path.exists());

    let rows = read_csv(&output, "PAY_timeheight_mwr_temperature_202407010000");
    assert_eq!(rows[0], "time,altitude,temperature");
    assert_eq!(rows.len(), 7);
    assert!(rows.contains(&"2024-07-01T06:00:00Z,1000.0,12.500".to_string()));
    assert!(rows.iter().skip(1).all(|row| !row.contains(",491.0,")));
}

#[tokio::test]
async fn test_timeseries_command_writes_chart_and_csv() {
    let output = output("timeseries");
    let request = TimeSeriesRequest {
        station: None,
        start: at(0),
        end: at(23),
        variable: Variable::Temperature,
        sources: vec![Source::Surface, Source::Mwr],
        altitude_m: Some(1000.0),
        models: ModelFiles::default(),
    };
    let path = commands::run_timeseries(&service(), &request, &output).await.unwrap();

    assert_eq!(file_name(&path), "PAY_timeseries_temperature_202407010000.svg");
    assert!(path.exists());

    let rows = read_csv(&output, "PAY_timeseries_temperature_202407010000");
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0], "time,source,temperature");
    assert_eq!(rows[1], "2024-07-01T00:00:00Z,PAY surface,16.100");
    assert_eq!(rows[6], "2024-07-01T12:00:00Z,PAY mwr 1000 m,20.000");
}

#[tokio::test]
async fn test_profile_command_rejects_unknown_station() {
    let request = ProfileRequest {
        station: Some("Atlantis".to_string()),
        time: at(12),
        variable: Variable::Temperature,
        sources: vec![Source::Rs],
        lower_altitude_m: None,
        upper_altitude_m: None,
        window_hours: DEFAULT_WINDOW_HOURS,
        models: ModelFiles::default(),
    };
    let err = commands::run_profile(&service(), &request, &output("unknown-station")).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<MeteoError>(), Some(MeteoError::UnknownStation(_))));
}

#[tokio::test]
async fn test_time_height_command_rejects_surface_source() {
    let request = TimeHeightRequest {
        station: None,
        start: at(0),
        end: at(23),
        variable: Variable::Temperature,
        source: Source::Surface,
        lower_altitude_m: None,
        upper_altitude_m: None,
        models: ModelFiles {
            icon: Some(PathBuf::from("unused.nc")),
            arome: None,
        },
    };
    let err = commands::run_time_height(&service(), &request, &output("surface-heatmap")).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<MeteoError>(), Some(MeteoError::Validation { .. })));
}
