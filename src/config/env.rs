use std::env;

pub enum EnvKey {
    ServerPort,
    AppEnv,
    FfmpegPath,
    WorkDir,
    IndexPage,
    MaxUploadBytes,
    Bitrate,
    Format,
    Overwrite,
    ErrorPolicy,
    OutputMode,
    TimeoutSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "PORT",
            EnvKey::AppEnv => "APP_ENV",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::WorkDir => "WORK_DIR",
            EnvKey::IndexPage => "INDEX_PAGE",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
            EnvKey::Bitrate => "TRANSCODE_BITRATE",
            EnvKey::Format => "TRANSCODE_FORMAT",
            EnvKey::Overwrite => "TRANSCODE_OVERWRITE",
            EnvKey::ErrorPolicy => "TRANSCODE_ERROR_POLICY",
            EnvKey::OutputMode => "OUTPUT_MODE",
            EnvKey::TimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
        }
    }
}

fn process_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Reads configuration variables through a lookup function.
pub struct EnvReader<F> {
    lookup: F,
}

impl EnvReader<fn(&str) -> Option<String>> {
    pub fn process() -> Self {
        Self {
            lookup: process_var,
        }
    }
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    pub fn get(&self, key: EnvKey) -> Option<String> {
        (self.lookup)(key.as_str())
    }

    pub fn get_or(&self, key: EnvKey, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}
