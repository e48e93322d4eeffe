use axum::routing::{get, post};
use axum::Router;
use crate::state::AppState;

pub mod dto;
pub mod error;
pub mod handler;
pub mod model;
pub mod service;


pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::landing_page))
        .route("/upload", post(handler::upload))
}
