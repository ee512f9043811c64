use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};

const TOKEN_TTL_DAYS: i64 = 7;
const TOKEN_LEN: usize = 48;

/// Issue a fresh bearer token for `user_id` and persist its session row.
pub(crate) async fn issue(pool: &SqlitePool, user_id: &str) -> AppResult<String> {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();
    let now = Utc::now();

    sqlx::query("INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now + Duration::days(TOKEN_TTL_DAYS))
        .bind(now)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Authenticated principal, resolved from the `Authorization: Bearer` header.
///
/// Missing, unknown and expired tokens each reject with their own 401
/// message. An expired session row is deleted on sight.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let Some(token) = header.and_then(|value| value.strip_prefix("Bearer ")) else {
            return Err(AppError::auth("Token required"));
        };

        let db_pool = SqlitePool::from_ref(state);
        let session = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT u.id, u.username, s.expires_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ?",
        )
        .bind(token)
        .fetch_optional(&db_pool)
        .await?;

        let Some((user_id, username, expires_at)) = session else {
            return Err(AppError::auth("Invalid token"));
        };

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&db_pool)
                .await?;
            return Err(AppError::auth("Token expired"));
        }

        Ok(AuthUser { user_id, username })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, id: &str, username: &str) {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at) VALUES (?, ?, ?, 'x', ?)",
        )
        .bind(id)
        .bind(username)
        .bind(format!("{username}@example.com"))
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn extract(pool: &SqlitePool, header: Option<&str>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, pool).await
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let pool = test_pool().await;

        let err = extract(&pool, None).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(message) if message == "Token required"));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let pool = test_pool().await;

        let err = extract(&pool, Some("Bearer nope")).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(message) if message == "Invalid token"));
    }

    #[tokio::test]
    async fn issued_token_resolves_the_user() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", "ada").await;

        let token = issue(&pool, "u1").await.unwrap();
        let user = extract(&pool, Some(&format!("Bearer {token}"))).await.unwrap();

        assert_eq!(user.user_id, "u1");
        assert_eq!(user.username, "ada");
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_purged() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", "ada").await;

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES ('stale', 'u1', ?, ?)")
            .bind(Utc::now() - Duration::days(1))
            .bind(Utc::now() - Duration::days(8))
            .execute(&pool)
            .await
            .unwrap();

        let err = extract(&pool, Some("Bearer stale")).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(message) if message == "Token expired"));

        let remaining = sqlx::query_as::<_, ()>("SELECT 1 FROM sessions WHERE token = 'stale'")
            .fetch_optional(&pool)
            .await
            .unwrap();
        assert!(remaining.is_none());
    }

    #[tokio::test]
    async fn two_issued_tokens_differ() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", "ada").await;

        let first = issue(&pool, "u1").await.unwrap();
        let second = issue(&pool, "u1").await.unwrap();

        assert_eq!(first.len(), TOKEN_LEN);
        assert_ne!(first, second);
    }
}
