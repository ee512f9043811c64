use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

mod login;
mod me;
mod register;
pub(crate) mod token;

pub use token::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/me", get(me::me))
}
