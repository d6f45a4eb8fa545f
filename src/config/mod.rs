//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{
    CliArgs, Command, CommonOverrides, LinkArgs, RenderArgs, WatchArgs, WatchOverrides,
};

use crate::domain::link::MAX_LINK_LENGTH;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "texflag";
const ENV_PREFIX: &str = "TEXFLAG";
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/";
const DEFAULT_DEBOUNCE_MS: u64 = 200;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_STORAGE_DIR: &str = ".texflag";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceSettings,
    pub preview: PreviewSettings,
    pub storage: StorageSettings,
    pub artifacts: ArtifactSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Base URL of the rendering service; `/render` is resolved against it.
    pub endpoint: Url,
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub debounce: Duration,
    pub max_link_length: usize,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub directory: PathBuf,
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

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Watch(args) => raw.apply_watch_overrides(&args.overrides),
        Command::Render(args) => raw.apply_common_overrides(&args.common),
        Command::Link(args) => raw.apply_common_overrides(&args.common),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    service: RawServiceSettings,
    preview: RawPreviewSettings,
    storage: RawDirectorySettings,
    artifacts: RawDirectorySettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_common_overrides(&mut self, overrides: &CommonOverrides) {
        if let Some(endpoint) = overrides.endpoint.as_ref() {
            self.service.endpoint = Some(endpoint.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_watch_overrides(&mut self, overrides: &WatchOverrides) {
        self.apply_common_overrides(&overrides.common);
        if let Some(millis) = overrides.debounce_ms {
            self.preview.debounce_ms = Some(millis);
        }
        if let Some(millis) = overrides.poll_interval_ms {
            self.preview.poll_interval_ms = Some(millis);
        }
        if let Some(directory) = overrides.storage_dir.as_ref() {
            self.storage.directory = Some(directory.clone());
        }
        if let Some(directory) = overrides.artifacts_dir.as_ref() {
            self.artifacts.directory = Some(directory.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            service,
            preview,
            storage,
            artifacts,
            logging,
        } = raw;

        let service = build_service_settings(service)?;
        let preview = build_preview_settings(preview)?;
        let storage = StorageSettings {
            directory: build_directory(
                storage.directory,
                PathBuf::from(DEFAULT_STORAGE_DIR),
                "storage.directory",
            )?,
        };
        let artifacts = ArtifactSettings {
            directory: build_directory(
                artifacts.directory,
                std::env::temp_dir(),
                "artifacts.directory",
            )?,
        };
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            service,
            preview,
            storage,
            artifacts,
            logging,
        })
    }
}

fn build_service_settings(service: RawServiceSettings) -> Result<ServiceSettings, LoadError> {
    let raw = service
        .endpoint
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let endpoint = Url::parse(raw.trim())
        .map_err(|err| LoadError::invalid("service.endpoint", format!("failed to parse: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "service.endpoint",
            format!("unsupported scheme `{}`", endpoint.scheme()),
        ));
    }
    if endpoint.cannot_be_a_base() || endpoint.host_str().is_none() {
        return Err(LoadError::invalid(
            "service.endpoint",
            "must be an absolute URL with a host",
        ));
    }
    Ok(ServiceSettings { endpoint })
}

fn build_preview_settings(preview: RawPreviewSettings) -> Result<PreviewSettings, LoadError> {
    let debounce = non_zero_u64(
        preview.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
        "preview.debounce_ms",
    )?;
    let poll_interval = non_zero_u64(
        preview.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        "preview.poll_interval_ms",
    )?;
    let max_link_length = non_zero_u32(
        preview.max_link_length.unwrap_or(MAX_LINK_LENGTH as u64),
        "preview.max_link_length",
    )?;

    Ok(PreviewSettings {
        debounce: Duration::from_millis(debounce.get()),
        max_link_length: max_link_length.get() as usize,
        poll_interval: Duration::from_millis(poll_interval.get()),
    })
}

fn build_directory(
    value: Option<PathBuf>,
    default: PathBuf,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let directory = value.unwrap_or(default);
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(directory)
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

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServiceSettings {
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPreviewSettings {
    debounce_ms: Option<u64>,
    max_link_length: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDirectorySettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    NonZeroU64::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
