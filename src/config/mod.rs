//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::{
    application::{readiness::PollingConfig, render::PipelineConfig},
    infra::error::InfraError,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "prepwise";
const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/graphql";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CACHE_CAPACITY: u64 = 64;
const DEFAULT_MIN_REFETCH_INTERVAL_MS: u64 = 1000;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Command-line arguments for the prepwise binary.
#[derive(Debug, Parser)]
#[command(
    name = "prepwise",
    version,
    about = "Follow, render and copy from generated interview-prep articles"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PREPWISE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Follow an article until it is ready, then print its rendered body.
    Read(ReadArgs),
    /// Render a local Markdown file into body HTML.
    Render(RenderArgs),
    /// Copy one code block of a ready article to the terminal clipboard.
    Copy(CopyArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ReadArgs {
    /// Article slug to follow.
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// Write the rendered body here instead of stdout.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ReadOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Markdown file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct CopyArgs {
    /// Article slug whose code block should be copied.
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// 1-based index of the code block to copy.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(usize))]
    pub block: usize,

    #[command(flatten)]
    pub overrides: ReadOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Keep a level-one heading on the first line of the body.
    #[arg(long = "keep-leading-heading", action = clap::ArgAction::SetTrue)]
    pub keep_leading_heading: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReadOverrides {
    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the GraphQL endpoint URL.
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Override the delay between readiness polls.
    #[arg(long = "poll-interval-seconds", value_name = "SECONDS")]
    pub poll_interval_seconds: Option<u64>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub source: SourceSettings,
    pub polling: PollingSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub endpoint: Url,
    pub timeout: Duration,
    pub cache_capacity: NonZeroUsize,
    pub min_refetch_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct PollingSettings {
    pub interval: Duration,
    pub status_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub suppress_leading_heading: bool,
}

impl From<&PollingSettings> for PollingConfig {
    fn from(settings: &PollingSettings) -> Self {
        PollingConfig {
            poll_interval: settings.interval,
            status_interval: settings.status_interval,
            status_seed: None,
        }
    }
}

impl From<&RenderSettings> for PipelineConfig {
    fn from(settings: &RenderSettings) -> Self {
        PipelineConfig {
            suppress_leading_heading: settings.suppress_leading_heading,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

impl From<LoadError> for InfraError {
    fn from(error: LoadError) -> Self {
        InfraError::configuration(error.to_string())
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PREPWISE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Read(args) => raw.apply_read_overrides(&args.overrides),
        Command::Copy(args) => raw.apply_read_overrides(&args.overrides),
        Command::Render(args) => {
            raw.apply_render_overrides(&args.render);
            raw.apply_logging_overrides(&args.logging);
        }
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    source: RawSourceSettings,
    polling: RawPollingSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_read_overrides(&mut self, overrides: &ReadOverrides) {
        if let Some(endpoint) = overrides.endpoint.as_ref() {
            self.source.endpoint = Some(endpoint.clone());
        }
        if let Some(seconds) = overrides.poll_interval_seconds {
            self.polling.interval_seconds = Some(seconds);
        }

        self.apply_render_overrides(&overrides.render);
        self.apply_logging_overrides(&overrides.logging);
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if overrides.keep_leading_heading {
            self.render.suppress_leading_heading = Some(false);
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            source,
            polling,
            render,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let source = build_source_settings(source)?;
        let polling = build_polling_settings(polling)?;
        let render = build_render_settings(render);

        Ok(Self {
            logging,
            source,
            polling,
            render,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_source_settings(source: RawSourceSettings) -> Result<SourceSettings, LoadError> {
    let endpoint_value = source
        .endpoint
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let endpoint = Url::parse(&endpoint_value)
        .map_err(|err| LoadError::invalid("source.endpoint", format!("invalid url: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "source.endpoint",
            "scheme must be http or https",
        ));
    }

    let timeout_secs = source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "source.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let capacity = non_zero_usize(
        source.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "source.cache_capacity",
    )?;

    let min_refetch_interval = Duration::from_millis(
        source
            .min_refetch_interval_ms
            .unwrap_or(DEFAULT_MIN_REFETCH_INTERVAL_MS),
    );

    Ok(SourceSettings {
        endpoint,
        timeout: Duration::from_secs(timeout_secs),
        cache_capacity: capacity,
        min_refetch_interval,
    })
}

fn build_polling_settings(polling: RawPollingSettings) -> Result<PollingSettings, LoadError> {
    let interval_secs = polling
        .interval_seconds
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
    if interval_secs == 0 {
        return Err(LoadError::invalid(
            "polling.interval_seconds",
            "must be greater than zero",
        ));
    }

    let status_secs = polling.status_interval_seconds.unwrap_or(interval_secs);
    if status_secs == 0 {
        return Err(LoadError::invalid(
            "polling.status_interval_seconds",
            "must be greater than zero",
        ));
    }

    Ok(PollingSettings {
        interval: Duration::from_secs(interval_secs),
        status_interval: Duration::from_secs(status_secs),
    })
}

fn build_render_settings(render: RawRenderSettings) -> RenderSettings {
    RenderSettings {
        suppress_leading_heading: render.suppress_leading_heading.unwrap_or(true),
    }
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    endpoint: Option<String>,
    timeout_seconds: Option<u64>,
    cache_capacity: Option<u64>,
    min_refetch_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPollingSettings {
    interval_seconds: Option<u64>,
    status_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    suppress_leading_heading: Option<bool>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
