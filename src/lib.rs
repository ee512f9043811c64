pub mod auth;
pub mod config;
pub mod conversations;
pub mod db;
pub mod error;
pub mod matches;
pub mod models;
pub mod skills;
pub mod users;

use axum::extract::FromRef;
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppJson, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
}

/// Assemble the full API router on top of `state`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api", get(home))
        .nest("/api/auth", auth::router())
        .nest("/api/skills", skills::router())
        .nest("/api/matches", matches::router())
        .nest("/api/users", users::router())
        .nest("/api/conversations", conversations::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> impl IntoResponse {
    "Welcome to the SkillSwap App!"
}
