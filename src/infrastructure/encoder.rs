use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::modules::transcode::model::TranscodeSettings;

const AUDIO_BITRATE: &str = "44K";
const STDERR_TAIL: usize = 2048;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<Output>;
}

pub struct SystemCommandExecutor;

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<Output> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("encoder did not finish within {0:?}")]
    TimedOut(Duration),
}

#[derive(Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    timeout: Option<Duration>,
    executor: Arc<dyn CommandExecutor>,
}

impl FfmpegEncoder {
    pub fn new(binary: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            binary,
            timeout,
            executor: Arc::new(SystemCommandExecutor),
        }
    }

    #[cfg(test)]
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Argument vector for one encode. Paths are passed as single arguments, never through a shell.
    pub fn build_args(input: &Path, output: &Path, settings: &TranscodeSettings) -> Vec<OsString> {
        vec![
            settings.overwrite.flag().into(),
            "-threads".into(),
            "0".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-b:v".into(),
            settings.bitrate.as_str().into(),
            "-b:a".into(),
            AUDIO_BITRATE.into(),
            "-f".into(),
            settings.container.muxer().into(),
            output.as_os_str().to_owned(),
        ]
    }

    pub async fn encode(
        &self,
        input: &Path,
        output: &Path,
        settings: &TranscodeSettings,
    ) -> Result<(), EncodeError> {
        let args = Self::build_args(input, output, settings);
        debug!("Running {} {:?}", self.binary.display(), args);

        let run = self.executor.run(&self.binary, &args);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| EncodeError::TimedOut(limit))?,
            None => run.await,
        };

        let out = result.map_err(|source| EncodeError::Spawn {
            program: self.binary.clone(),
            source,
        })?;

        if !out.status.success() {
            return Err(EncodeError::Failed {
                status: out.status,
                stderr: stderr_tail(&out.stderr),
            });
        }

        info!(
            "Encoded {} -> {} at {}",
            input.display(),
            output.display(),
            settings.bitrate
        );
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    match trimmed.char_indices().rev().nth(STDERR_TAIL) {
        Some((idx, _)) => trimmed[idx..].to_string(),
        None => trimmed.to_string(),
    }
}
