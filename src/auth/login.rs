use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::token;
use crate::error::{AppError, AppJson, AppResult};
use crate::models::User;
use crate::users;

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    password: String,
}

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    AppJson(body): AppJson<LoginBody>,
) -> AppResult<Response> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    // Same message for unknown email and wrong password.
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, bio, location, created_at
         FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(&db_pool)
    .await?;
    let Some(user) = user else {
        return Err(AppError::auth("Invalid email or password"));
    };
    if !bcrypt::verify(&body.password, &user.password_hash)? {
        return Err(AppError::auth("Invalid email or password"));
    }

    let token = token::issue(&db_pool, &user.id).await?;
    tracing::info!(username = %user.username, "user logged in");

    let view = users::user_view(&db_pool, user).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": view,
    }))
    .into_response())
}
