use std::sync::LazyLock;

use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::token;
use crate::db;
use crate::error::{AppError, AppJson, AppResult};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub(crate) const BCRYPT_COST: u32 = 10;

#[derive(Deserialize)]
pub(crate) struct RegisterBody {
    username: String,
    email: String,
    password: String,
    bio: Option<String>,
    location: Option<String>,
}

#[debug_handler]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    AppJson(body): AppJson<RegisterBody>,
) -> AppResult<Response> {
    let username = body.username.trim();
    let email = body.email.trim();
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(AppError::validation(
            "Username, email and password are required",
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::validation("Please provide a valid email address"));
    }
    if body.password.chars().count() < 6 {
        return Err(AppError::validation(
            "Password must be at least 6 characters",
        ));
    }

    let taken = sqlx::query_as::<_, ()>("SELECT 1 FROM users WHERE email = ? OR username = ?")
        .bind(email)
        .bind(username)
        .fetch_optional(&db_pool)
        .await?
        .is_some();
    if taken {
        return Err(AppError::conflict(
            "This email or username is already in use",
        ));
    }

    let password_hash = bcrypt::hash(&body.password, BCRYPT_COST)?;
    let id = Uuid::now_v7().to_string();
    let bio = body.bio.unwrap_or_default();
    let location = body.location.unwrap_or_default();

    let inserted = sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, bio, location, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(&bio)
    .bind(&location)
    .bind(Utc::now())
    .execute(&db_pool)
    .await;
    if let Err(err) = inserted {
        // Two concurrent registrations can both pass the probe above.
        if db::is_unique_violation(&err) {
            return Err(AppError::conflict(
                "This email or username is already in use",
            ));
        }
        return Err(err.into());
    }

    let token = token::issue(&db_pool, &id).await?;
    tracing::info!(username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "token": token,
            "user": {
                "id": id,
                "username": username,
                "email": email,
                "bio": bio,
                "location": location,
            },
        })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_accepts_plain_addresses() {
        assert!(EMAIL_RE.is_match("ada@example.com"));
        assert!(EMAIL_RE.is_match("a.b+c@sub.domain.org"));
    }

    #[test]
    fn email_pattern_rejects_junk() {
        assert!(!EMAIL_RE.is_match("no-at-sign"));
        assert!(!EMAIL_RE.is_match("two@@example.com"));
        assert!(!EMAIL_RE.is_match("spaces in@example.com"));
        assert!(!EMAIL_RE.is_match("missing@dot"));
    }
}
