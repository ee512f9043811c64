use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Response}, Json};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{Skill, SkillRole, User};
use crate::skills::profile;
use crate::AppState;

/// A user as shown to other users, with both skill lists resolved and
/// the password hash stripped by `User`'s serialization.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub skills_to_teach: Vec<Skill>,
    pub skills_to_learn: Vec<Skill>,
}

pub(crate) async fn user_view(pool: &SqlitePool, user: User) -> AppResult<UserView> {
    let skills_to_teach = profile::skills_for(pool, &user.id, SkillRole::Teach).await?;
    let skills_to_learn = profile::skills_for(pool, &user.id, SkillRole::Learn).await?;
    Ok(UserView {
        user,
        skills_to_teach,
        skills_to_learn,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListUsersQuery {
    exclude_user_id: Option<String>,
}

#[debug_handler]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Response> {
    let users = match &query.exclude_user_id {
        Some(exclude) => {
            sqlx::query_as::<_, User>(
                "SELECT id, username, email, password_hash, bio, location, created_at
                 FROM users WHERE id != ? ORDER BY created_at, id",
            )
            .bind(exclude)
            .fetch_all(&db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, User>(
                "SELECT id, username, email, password_hash, bio, location, created_at
                 FROM users ORDER BY created_at, id",
            )
            .fetch_all(&db_pool)
            .await?
        }
    };

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(user_view(&db_pool, user).await?);
    }

    Ok(Json(json!({ "success": true, "users": views })).into_response())
}

#[debug_handler]
pub(crate) async fn get_one(
    State(db_pool): State<SqlitePool>,
    Path(user_id): Path<String>,
) -> AppResult<Response> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, bio, location, created_at
         FROM users WHERE id = ?",
    )
    .bind(&user_id)
    .fetch_optional(&db_pool)
    .await?;
    let Some(user) = user else {
        return Err(AppError::not_found("User not found"));
    };

    let view = user_view(&db_pool, user).await?;
    Ok(Json(json!({ "success": true, "user": view })).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_one))
}
