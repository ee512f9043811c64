use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Json};
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::users;

#[debug_handler]
pub(crate) async fn me(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Response> {
    let record = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, bio, location, created_at
         FROM users WHERE id = ?",
    )
    .bind(&user.user_id)
    .fetch_optional(&db_pool)
    .await?;
    let Some(record) = record else {
        return Err(AppError::not_found("User not found"));
    };

    let view = users::user_view(&db_pool, record).await?;
    Ok(Json(json!({ "success": true, "user": view })).into_response())
}
