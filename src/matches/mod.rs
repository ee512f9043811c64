use axum::routing::{get, post, put};
use axum::Router;

use crate::AppState;

pub(crate) mod engine;
pub(crate) mod ledger;

pub use engine::{find_matches, MatchCandidate, MatchOutcome, MatchType, MatchedUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/find", get(engine::find))
        .route("/create", post(ledger::create))
        .route("/", get(ledger::list))
        .route("/{match_id}", put(ledger::resolve))
}
