use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{AppConfig, AppMode};
use crate::state::AppState;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;

#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcode_upload=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting server...");

    let config = AppConfig::new()?;
    if config.mode == AppMode::Production && config.server_port == 443 {
        warn!("Listening on 443 without TLS; terminate TLS in front of this service");
    }

    let state = AppState::new(config);
    state.workspace.prepare().await?;
    info!(
        "Work directory {} ({:?} output), encoder {}, {:?} error policy",
        state.workspace.root().display(),
        state.workspace.mode(),
        state.encoder.binary().display(),
        state.config.error_policy
    );

    let addr = format!("0.0.0.0:{}", state.config.server_port);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
