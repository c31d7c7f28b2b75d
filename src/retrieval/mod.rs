//! Observation retrieval through the external data-warehouse command
//!
//! One retrieval is one blocking subprocess invocation guarded by a timeout.
//! There are no retries: a failed or slow command aborts the calling command.

pub mod parse;

use crate::config::RetrievalConfig;
use crate::models::{DataProduct, ProfileTable, Station, Variable};
use crate::MeteoError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

pub use parse::parse_pipe_table;

const REQUEST_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// One retrieval request
#[derive(Debug, Clone, PartialEq)]
pub struct DwhRequest {
    pub product: DataProduct,
    /// Station abbreviation
    pub station: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Parameter codes to retrieve
    pub parameters: Vec<String>,
}

impl DwhRequest {
    /// Request every parameter the product measures
    #[must_use]
    pub fn new(product: DataProduct, station: &Station, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let parameters = Variable::measured_by(product)
            .into_iter()
            .filter_map(|v| v.dwh_parameter(product))
            .map(str::to_string)
            .collect();
        Self {
            product,
            station: station.abbreviation.clone(),
            start,
            end,
            parameters,
        }
    }

    /// Command-line arguments describing this request
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-s".to_string(),
            self.product.selector().to_string(),
            "-i".to_string(),
            format!("nat_abbr,{}", self.station),
            "-t".to_string(),
            format!(
                "{},{}",
                self.start.format(REQUEST_TIME_FORMAT),
                self.end.format(REQUEST_TIME_FORMAT)
            ),
            "-p".to_string(),
            self.parameters.join(","),
        ]
    }

    fn validate(&self) -> Result<(), MeteoError> {
        if self.start > self.end {
            return Err(MeteoError::validation(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        if self.parameters.is_empty() {
            return Err(MeteoError::validation("no parameters requested"));
        }
        Ok(())
    }
}

/// Source of raw retrieval output
#[async_trait]
pub trait DwhRetriever: Send + Sync {
    /// Run the retrieval and return its standard output
    async fn retrieve(&self, request: &DwhRequest) -> Result<String, MeteoError>;
}

/// Retriever that shells out to the configured command
#[derive(Debug, Clone)]
pub struct CommandRetriever {
    command: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl CommandRetriever {
    #[must_use]
    pub fn new(command: impl Into<String>, extra_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            extra_args,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.extra_args.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }
}

#[async_trait]
impl DwhRetriever for CommandRetriever {
    #[instrument(skip(self), fields(command = %self.command))]
    async fn retrieve(&self, request: &DwhRequest) -> Result<String, MeteoError> {
        request.validate()?;
        let args = request.to_args();
        debug!("running {} {} {}", self.command, args.join(" "), self.extra_args.join(" "));
        let start_time = Instant::now();

        let child = Command::new(&self.command)
            .args(&args)
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MeteoError::retrieval(format!("failed to start '{}': {e}", self.command)))?;

        // Dropping the pending future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| MeteoError::retrieval(format!("failed to read '{}' output: {e}", self.command)))?,
            Err(_) => {
                warn!(timeout_s = self.timeout.as_secs_f64(), "retrieval timed out, process killed");
                return Err(MeteoError::RetrievalTimeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let elapsed = start_time.elapsed();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MeteoError::retrieval(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        info!(
            "retrieved {} bytes in {:.3}s",
            output.stdout.len(),
            elapsed.as_secs_f64()
        );
        if elapsed > self.timeout / 2 {
            warn!("Slow retrieval detected: {:.3}s", elapsed.as_secs_f64());
        }

        String::from_utf8(output.stdout)
            .map_err(|_| MeteoError::retrieval(format!("'{}' produced non UTF-8 output", self.command)))
    }
}

/// Retrieve one product for a station and parse it into a table
pub async fn fetch_table(
    retriever: &dyn DwhRetriever,
    product: DataProduct,
    station: &Station,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ProfileTable, MeteoError> {
    let request = DwhRequest::new(product, station, start, end);
    info!(
        product = product.tag(),
        station = %station.abbreviation,
        "retrieving {} to {}",
        start.format("%Y-%m-%d %H:%M"),
        end.format("%Y-%m-%d %H:%M")
    );
    let text = retriever.retrieve(&request).await?;
    parse_pipe_table(&text, product, station.altitude_m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StationRegistry;
    use chrono::TimeZone;

    fn payerne() -> Station {
        StationRegistry::default().find("PAY").unwrap().clone()
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 0).unwrap(),
        )
    }

    #[test]
    fn test_request_args() {
        let (start, end) = window();
        let request = DwhRequest::new(DataProduct::Radiometer, &payerne(), start, end);
        assert_eq!(
            request.to_args(),
            vec![
                "-s",
                "profile_mwr",
                "-i",
                "nat_abbr,PAY",
                "-t",
                "20240701000000,20240701235900",
                "-p",
                "3147,3148"
            ]
        );
    }

    #[test]
    fn test_request_validation() {
        let (start, end) = window();
        let mut request = DwhRequest::new(DataProduct::Surface, &payerne(), end, start);
        assert!(matches!(request.validate(), Err(MeteoError::Validation { .. })));

        request.start = start;
        request.end = end;
        request.parameters.clear();
        assert!(request.validate().is_err());
    }

    /// Executable shell script in a per-process temp directory
    #[cfg(unix)]
    fn script(name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("meteoprofiles-retrieval-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_retriever_returns_stdout() {
        let (start, end) = window();
        let retriever = CommandRetriever::new("echo", vec![], Duration::from_secs(5));
        let request = DwhRequest::new(DataProduct::Surface, &payerne(), start, end);
        let output = retriever.retrieve(&request).await.unwrap();
        assert!(output.contains("nat_abbr,PAY"));
        assert!(output.contains("tre200s0"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extra_args_follow_request() {
        let (start, end) = window();
        let retriever = CommandRetriever::new(
            "echo",
            vec!["--format".into(), "pipe".into()],
            Duration::from_secs(5),
        );
        let request = DwhRequest::new(DataProduct::Radiometer, &payerne(), start, end);
        let output = retriever.retrieve(&request).await.unwrap();
        assert!(output.starts_with("-s profile_mwr "));
        assert!(output.trim_end().ends_with("-p 3147,3148 --format pipe"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_retriever_times_out() {
        let (start, end) = window();
        let command = script("slow_dwh", "exec sleep 5");
        let retriever = CommandRetriever::new(command.to_string_lossy(), vec![], Duration::from_millis(200));
        let request = DwhRequest::new(DataProduct::Surface, &payerne(), start, end);
        let started = Instant::now();
        let err = retriever.retrieve(&request).await.unwrap_err();
        assert!(matches!(err, MeteoError::RetrievalTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_retriever_reports_failure() {
        let (start, end) = window();
        let command = script("failing_dwh", "echo station unknown >&2; exit 3");
        let retriever = CommandRetriever::new(command.to_string_lossy(), vec![], Duration::from_secs(5));
        let request = DwhRequest::new(DataProduct::Surface, &payerne(), start, end);
        let err = retriever.retrieve(&request).await.unwrap_err();
        assert!(matches!(err, MeteoError::Retrieval { .. }));
        assert!(err.to_string().contains("station unknown"));
    }

    #[tokio::test]
    async fn test_missing_command() {
        let (start, end) = window();
        let retriever = CommandRetriever::new("/nonexistent/dwh_retrieve", vec![], Duration::from_secs(5));
        let request = DwhRequest::new(DataProduct::Surface, &payerne(), start, end);
        let err = retriever.retrieve(&request).await.unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}
