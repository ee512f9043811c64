use axum::routing::{delete, get, post};
use axum::Router;

use crate::AppState;

pub(crate) mod catalog;
pub(crate) mod profile;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list).post(catalog::create))
        .route("/categories", get(catalog::categories))
        .route("/add-to-user", post(profile::add_to_user))
        .route("/remove-from-user", delete(profile::remove_from_user))
}
