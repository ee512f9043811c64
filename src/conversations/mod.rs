use axum::routing::get;
use axum::Router;

use crate::AppState;

pub(crate) mod convo;
pub(crate) mod msg;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(convo::list).post(convo::open))
        .route("/{id}/messages", get(msg::list).post(msg::post))
}
