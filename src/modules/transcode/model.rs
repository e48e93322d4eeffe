use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::dto::UploadQuery;

/// Highest accepted video bitrate, in bits per second.
const MAX_BITRATE: u64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid bitrate `{0}`: expected digits with optional K/M suffix, between 1 and 100M")]
    Bitrate(String),
    #[error("unsupported output format `{0}`: expected one of mp4, webm, mkv, mov")]
    Format(String),
    #[error("unknown {option} value `{value}`")]
    Unknown { option: &'static str, value: String },
}

/// Video bitrate token passed to the encoder as `-b:v`, e.g. `1M` or `200K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitrate(String);

impl Bitrate {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bits_per_second(&self) -> u64 {
        let (digits, multiplier) = split_suffix(&self.0);
        digits.parse::<u64>().unwrap_or(0) * multiplier
    }
}

fn split_suffix(token: &str) -> (&str, u64) {
    match token.chars().last() {
        Some('K') => (&token[..token.len() - 1], 1_000),
        Some('M') => (&token[..token.len() - 1], 1_000_000),
        _ => (token, 1),
    }
}

impl FromStr for Bitrate {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let (digits, multiplier) = split_suffix(&normalized);

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SettingsError::Bitrate(s.to_string()));
        }

        let value = digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .ok_or_else(|| SettingsError::Bitrate(s.to_string()))?;

        if value == 0 || value > MAX_BITRATE {
            return Err(SettingsError::Bitrate(s.to_string()));
        }

        Ok(Self(normalized))
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
    Webm,
    Mkv,
    Mov,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
            Container::Mkv => "mkv",
            Container::Mov => "mov",
        }
    }

    /// Muxer name understood by `ffmpeg -f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
            Container::Mkv => "matroska",
            Container::Mov => "mov",
        }
    }
}

impl FromStr for Container {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Container::Mp4),
            "webm" => Ok(Container::Webm),
            "mkv" | "matroska" => Ok(Container::Mkv),
            "mov" => Ok(Container::Mov),
            _ => Err(SettingsError::Format(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    Overwrite,
    Refuse,
}

impl OverwritePolicy {
    pub fn flag(&self) -> &'static str {
        match self {
            OverwritePolicy::Overwrite => "-y",
            OverwritePolicy::Refuse => "-n",
        }
    }
}

impl FromStr for OverwritePolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" | "yes" | "true" => Ok(OverwritePolicy::Overwrite),
            "refuse" | "no" | "false" => Ok(OverwritePolicy::Refuse),
            _ => Err(SettingsError::Unknown {
                option: "overwrite policy",
                value: s.to_string(),
            }),
        }
    }
}

/// What the upload handler does when the encoder fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Answer 500 with the failure; never serve the output.
    Strict,
    /// Log the failure and serve whatever the output path holds.
    Lenient,
}

impl FromStr for ErrorPolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ErrorPolicy::Strict),
            "lenient" => Ok(ErrorPolicy::Lenient),
            _ => Err(SettingsError::Unknown {
                option: "error policy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Every request writes to its own output file.
    Isolated,
    /// Every request writes to the same output file. Concurrent requests can read each other's results.
    Shared,
}

impl FromStr for OutputMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolated" => Ok(OutputMode::Isolated),
            "shared" => Ok(OutputMode::Shared),
            _ => Err(SettingsError::Unknown {
                option: "output mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeSettings {
    pub bitrate: Bitrate,
    pub container: Container,
    pub overwrite: OverwritePolicy,
}

impl TranscodeSettings {
    /// Applies the per-request overrides on top of the configured defaults.
    pub fn resolve(&self, query: &UploadQuery) -> Result<Self, SettingsError> {
        let bitrate = match query.bitrate.as_deref() {
            Some(token) => token.parse()?,
            None => self.bitrate.clone(),
        };
        let container = match query.format.as_deref() {
            Some(token) => token.parse()?,
            None => self.container,
        };

        Ok(Self {
            bitrate,
            container,
            overwrite: self.overwrite,
        })
    }
}
