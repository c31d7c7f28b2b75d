//! Tracing subscriber setup

use crate::MeteoError;
use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter directive: `--verbose` wins, then `RUST_LOG`, then the configured level
#[must_use]
pub fn filter_directive(config: &LoggingConfig, verbose: bool, rust_log: Option<&str>) -> String {
    if verbose {
        return "meteoprofiles=debug,info".to_string();
    }
    match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) => directive.to_string(),
        None => format!("meteoprofiles={},warn", config.level.to_ascii_lowercase()),
    }
}

/// Install the global subscriber writing to stderr
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<(), MeteoError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(config, verbose, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| MeteoError::config(format!("invalid log filter '{directive}': {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose);
    let result = if config.format.eq_ignore_ascii_case("compact") {
        builder.compact().try_init()
    } else {
        builder.pretty().try_init()
    };
    result.map_err(|e| MeteoError::config(format!("failed to initialise logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_precedence() {
        let config = LoggingConfig {
            level: "WARN".to_string(),
            format: "compact".to_string(),
        };
        assert_eq!(filter_directive(&config, false, None), "meteoprofiles=warn,warn");
        assert_eq!(filter_directive(&config, false, Some("trace")), "trace");
        assert_eq!(filter_directive(&config, false, Some("  ")), "meteoprofiles=warn,warn");
        assert_eq!(filter_directive(&config, true, Some("trace")), "meteoprofiles=debug,info");
    }
}
