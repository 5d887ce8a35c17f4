//! Logging bootstrap for SPR binaries.
//!
//! Wraps `tracing-subscriber` behind a small [`LogConfig`] so the server and
//! the ingest binary configure logging the same way: a base level, an output
//! target (console, rolling daily file, or both), a plain or JSON format,
//! and optional per-target filter directives.
//!
//! # Examples
//!
//! ```rust,ignore
//! use spr_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::builder()
//!     .level(LogLevel::Debug)
//!     .log_file_prefix("spr-server")
//!     .filter_directives("spr_server=debug,tower_http=debug")
//!     .build();
//!
//! // Environment variables win over the built defaults when present.
//! let config = LogConfig::from_env().unwrap_or(config);
//! init_logging(&config).unwrap();
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Base severity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(anyhow!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Console,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            other => Err(anyhow!("unknown log output '{other}'")),
        }
    }
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogOutput::Console => "console",
            LogOutput::File => "file",
            LogOutput::Both => "both",
        };
        f.write_str(s)
    }
}

/// Line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogFormat::Plain => "plain",
            LogFormat::Json => "json",
        };
        f.write_str(s)
    }
}

/// Full logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base severity threshold
    pub level: LogLevel,
    /// Output target
    pub output: LogOutput,
    /// Line format
    pub format: LogFormat,
    /// Directory for rolling daily log files
    pub log_dir: PathBuf,
    /// File name prefix for rolling log files
    pub log_file_prefix: String,
    /// Extra `target=level` directives, comma separated
    pub filter_directives: Option<String>,
    /// Emit file/line of the call site
    pub include_location: bool,
    /// Emit the event target (module path)
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Plain,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "spr".to_string(),
            filter_directives: None,
            include_location: false,
            include_targets: true,
        }
    }
}

impl LogConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder {
            config: LogConfig::default(),
        }
    }

    /// Read the configuration from `LOG_*` environment variables.
    ///
    /// Fails when a variable is present but unparsable, so typos surface at
    /// startup instead of silently falling back.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = LogConfig::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.level = level.parse().context("LOG_LEVEL")?;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            config.output = output.parse().context("LOG_OUTPUT")?;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.format = format.parse().context("LOG_FORMAT")?;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("LOG_FILE_PREFIX") {
            config.log_file_prefix = prefix;
        }
        if let Ok(filter) = std::env::var("LOG_FILTER") {
            config.filter_directives = Some(filter);
        }
        if let Ok(loc) = std::env::var("LOG_INCLUDE_LOCATION") {
            config.include_location = loc.parse().context("LOG_INCLUDE_LOCATION")?;
        }
        if let Ok(targets) = std::env::var("LOG_INCLUDE_TARGETS") {
            config.include_targets = targets.parse().context("LOG_INCLUDE_TARGETS")?;
        }

        Ok(config)
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::from_default_env().add_directive(self.level.as_filter().into());
        if let Some(directives) = &self.filter_directives {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(e) => eprintln!("ignoring log directive '{directive}': {e}"),
                }
            }
        }
        filter
    }
}

/// Builder for [`LogConfig`].
#[derive(Debug, Clone)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    pub fn include_location(mut self, include: bool) -> Self {
        self.config.include_location = include;
        self
    }

    pub fn include_targets(mut self, include: bool) -> Self {
        self.config.include_targets = include;
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// Returns an error if a subscriber is already installed or the filter
/// directives are invalid. The file appender guard is intentionally leaked:
/// log files stay open for the life of the process.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    match config.output {
        LogOutput::Console => init_console(config),
        LogOutput::File => init_file(config),
        LogOutput::Both => init_both(config),
    }
}

fn console_writer() -> fn() -> std::io::Stdout {
    std::io::stdout
}

fn init_console(config: &LogConfig) -> anyhow::Result<()> {
    let filter = config.env_filter();
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(console_writer())
        .with_target(config.include_targets)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?,
    }
    Ok(())
}

fn init_file(config: &LogConfig) -> anyhow::Result<()> {
    let filter = config.env_filter();
    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    std::mem::forget(guard);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(config.include_targets)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?,
    }
    Ok(())
}

fn init_both(config: &LogConfig) -> anyhow::Result<()> {
    let filter = config.env_filter();
    let console = tracing_subscriber::fmt::layer()
        .with_writer(console_writer())
        .with_target(config.include_targets)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    std::mem::forget(guard);

    let file = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(config.include_targets)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(console.boxed())
            .with(file.boxed())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(console.json().boxed())
            .with(file.json().boxed())
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_output_from_str() {
        assert_eq!("console".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!("stdout".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!("file".parse::<LogOutput>().unwrap(), LogOutput::File);
        assert_eq!("both".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert!("syslog".parse::<LogOutput>().is_err());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("plain".parse::<LogFormat>().unwrap(), LogFormat::Plain);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_builder() {
        let config = LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Both)
            .format(LogFormat::Json)
            .log_dir("/var/log/spr")
            .log_file_prefix("spr-server")
            .filter_directives("spr_server=trace,tower_http=debug")
            .include_location(true)
            .build();

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/spr"));
        assert_eq!(config.log_file_prefix, "spr-server");
        assert!(config.include_location);
        assert!(config.include_targets);
    }

    #[test]
    fn test_env_filter_ignores_bad_directives() {
        let config = LogConfig::builder()
            .filter_directives("spr_server=debug,===broken===")
            .build();
        // Must not panic; the bad directive is skipped.
        let _ = config.env_filter();
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.output, LogOutput::Console);
        assert_eq!(config.format, LogFormat::Plain);
        assert_eq!(config.log_file_prefix, "spr");
    }
}
