//! Fixtures shared by the unit tests: hand-built multipart bodies and an encoder stand-in.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

use crate::config::settings::{AppConfig, AppMode};
use crate::infrastructure::encoder::{CommandExecutor, FfmpegEncoder};
use crate::modules::transcode::model::{
    Container, ErrorPolicy, OutputMode, OverwritePolicy, TranscodeSettings,
};
use crate::state::AppState;

const BOUNDARY: &str = "transcode-upload-test-boundary";

pub struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            data,
        }
    }
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"", part.name).as_bytes(),
        );
        if let Some(file_name) = part.file_name {
            body.extend_from_slice(format!("; filename=\"{file_name}\"").as_bytes());
            body.extend_from_slice(b"\r\nContent-Type: application/octet-stream");
        }
        body.extend_from_slice(b"\r\n\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

/// Stands in for ffmpeg: writes `encoded[<bitrate>]:<input bytes>` to the output argument.
pub struct FakeEncoder {
    code: i32,
    write_output: bool,
    barrier: Option<Arc<Barrier>>,
    runs: AtomicUsize,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self {
            code: 0,
            write_output: true,
            barrier: None,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn without_output(mut self) -> Self {
        self.write_output = false;
        self
    }

    /// Every run waits on `barrier` after writing, so concurrent runs finish writing before any returns.
    pub fn interleaved(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn expected(bitrate: &str, input: &[u8]) -> Vec<u8> {
        let mut out = format!("encoded[{bitrate}]:").into_bytes();
        out.extend_from_slice(input);
        out
    }
}

fn arg_after(args: &[OsString], flag: &str) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

#[async_trait]
impl CommandExecutor for FakeEncoder {
    async fn run(&self, _program: &Path, args: &[OsString]) -> std::io::Result<Output> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        let input = arg_after(args, "-i").expect("missing -i");
        let bitrate = arg_after(args, "-b:v").expect("missing -b:v");
        let output = PathBuf::from(args.last().expect("missing output"));

        if self.write_output {
            let data = tokio::fs::read(&input).await?;
            let encoded = Self::expected(&bitrate.to_string_lossy(), &data);
            tokio::fs::write(&output, encoded).await?;
        }

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        Ok(Output {
            status: exit_status(self.code),
            stdout: Vec::new(),
            stderr: if self.code == 0 {
                Vec::new()
            } else {
                b"simulated encoder failure".to_vec()
            },
        })
    }
}

pub fn test_config(dir: &Path, error_policy: ErrorPolicy, output_mode: OutputMode) -> AppConfig {
    AppConfig {
        server_port: 0,
        mode: AppMode::Development,
        ffmpeg_path: PathBuf::from("ffmpeg"),
        work_dir: dir.join("work"),
        index_page: dir.join("index.html"),
        max_upload_bytes: 1024 * 1024,
        transcode: TranscodeSettings {
            bitrate: "1M".parse().unwrap(),
            container: Container::Mp4,
            overwrite: OverwritePolicy::Overwrite,
        },
        error_policy,
        output_mode,
        encode_timeout: None,
    }
}

pub fn test_state(
    dir: &Path,
    error_policy: ErrorPolicy,
    output_mode: OutputMode,
    fake: Arc<FakeEncoder>,
) -> AppState {
    let config = test_config(dir, error_policy, output_mode);
    std::fs::create_dir_all(&config.work_dir).unwrap();
    let encoder = FfmpegEncoder::new(config.ffmpeg_path.clone(), None).with_executor(fake);
    AppState::with_encoder(config, encoder)
}
