use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::config::env::{EnvKey, EnvReader};
use crate::modules::transcode::model::{
    ErrorPolicy, OutputMode, OverwritePolicy, SettingsError, TranscodeSettings,
};

const DEFAULT_PORT: u16 = 3000;
const PRODUCTION_PORT: u16 = 443;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {source}")]
    Invalid {
        key: &'static str,
        #[source]
        source: SettingsError,
    },
    #[error("invalid {key}: `{value}` is not a number")]
    NotANumber { key: &'static str, value: String },
    #[error("TRANSCODE_OVERWRITE=refuse cannot be combined with OUTPUT_MODE=shared")]
    RefuseWithSharedOutput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppMode {
    Development,
    Production,
}

impl AppMode {
    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => AppMode::Production,
            _ => AppMode::Development,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub mode: AppMode,
    pub ffmpeg_path: PathBuf,
    pub work_dir: PathBuf,
    pub index_page: PathBuf,
    pub max_upload_bytes: usize,
    pub transcode: TranscodeSettings,
    pub error_policy: ErrorPolicy,
    pub output_mode: OutputMode,
    pub encode_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_env(&EnvReader::process())
    }

    pub fn from_env<F>(env: &EnvReader<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = AppMode::from_env_value(&env.get_or(EnvKey::AppEnv, "development"));
        let server_port = resolve_port(env.get(EnvKey::ServerPort).as_deref(), &mode)?;

        let transcode = TranscodeSettings {
            bitrate: parse_setting(env, EnvKey::Bitrate, "1M")?,
            container: parse_setting(env, EnvKey::Format, "mp4")?,
            overwrite: parse_setting(env, EnvKey::Overwrite, "overwrite")?,
        };
        let output_mode: OutputMode = parse_setting(env, EnvKey::OutputMode, "isolated")?;

        // `-n` on the one shared output path fails every request after the first.
        if output_mode == OutputMode::Shared && transcode.overwrite == OverwritePolicy::Refuse {
            return Err(ConfigError::RefuseWithSharedOutput);
        }

        let work_dir = env
            .get(EnvKey::WorkDir)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("transcode-upload"));

        let timeout_secs: u64 = parse_number(env, EnvKey::TimeoutSecs, 0)?;

        Ok(Self {
            server_port,
            mode,
            ffmpeg_path: PathBuf::from(env.get_or(EnvKey::FfmpegPath, "ffmpeg")),
            work_dir,
            index_page: PathBuf::from(env.get_or(EnvKey::IndexPage, "static/index.html")),
            max_upload_bytes: parse_number(env, EnvKey::MaxUploadBytes, DEFAULT_MAX_UPLOAD_BYTES)?,
            transcode,
            error_policy: parse_setting(env, EnvKey::ErrorPolicy, "strict")?,
            output_mode,
            encode_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

fn parse_setting<T, F>(env: &EnvReader<F>, key: EnvKey, default: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = SettingsError>,
    F: Fn(&str) -> Option<String>,
{
    let name = key.as_str();
    env.get_or(key, default)
        .parse()
        .map_err(|source| ConfigError::Invalid { key: name, source })
}

fn parse_number<T, F>(env: &EnvReader<F>, key: EnvKey, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let name = key.as_str();
    match env.get(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::NotANumber { key: name, value })
        }
        _ => Ok(default),
    }
}

/// An explicit port always wins; otherwise production listens on 443 and everything else on 3000.
pub fn resolve_port(explicit: Option<&str>, mode: &AppMode) -> Result<u16, ConfigError> {
    match explicit.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.parse().map_err(|_| ConfigError::NotANumber {
            key: EnvKey::ServerPort.as_str(),
            value: value.to_string(),
        }),
        None => Ok(match mode {
            AppMode::Production => PRODUCTION_PORT,
            AppMode::Development => DEFAULT_PORT,
        }),
    }
}
