use crate::config::settings::AppConfig;
use crate::infrastructure::encoder::FfmpegEncoder;
use crate::infrastructure::workspace::Workspace;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub workspace: Workspace,
    pub encoder: FfmpegEncoder,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let encoder = FfmpegEncoder::new(config.ffmpeg_path.clone(), config.encode_timeout);
        Self::with_encoder(config, encoder)
    }

    pub fn with_encoder(config: AppConfig, encoder: FfmpegEncoder) -> Self {
        let workspace = Workspace::new(config.work_dir.clone(), config.output_mode);
        Self {
            config,
            workspace,
            encoder,
        }
    }
}
