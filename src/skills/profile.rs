use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::AuthUser;
use crate::db;
use crate::error::{AppError, AppJson, AppResult};
use crate::models::{Skill, SkillRole};
use crate::skills::catalog;

/// Skill ids on one side of a user's profile, in the order they were added.
pub(crate) async fn skill_ids(
    pool: &SqlitePool,
    user_id: &str,
    role: SkillRole,
) -> AppResult<Vec<String>> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT skill_id FROM user_skills WHERE user_id = ? AND role = ? ORDER BY rowid",
    )
    .bind(user_id)
    .bind(role)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// One side of a user's profile resolved to full catalog rows.
pub(crate) async fn skills_for(
    pool: &SqlitePool,
    user_id: &str,
    role: SkillRole,
) -> AppResult<Vec<Skill>> {
    let ids = skill_ids(pool, user_id, role).await?;
    catalog::resolve_skill_refs(pool, &ids).await
}

pub(crate) async fn add_skill(
    pool: &SqlitePool,
    user_id: &str,
    skill_id: &str,
    role: SkillRole,
) -> AppResult<()> {
    let insert = sqlx::query("INSERT INTO user_skills (user_id, skill_id, role) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(skill_id)
        .bind(role)
        .execute(pool)
        .await;
    match insert {
        Ok(_) => Ok(()),
        Err(err) if db::is_unique_violation(&err) => Err(AppError::conflict(format!(
            "This skill is already in your {} list",
            role.as_str()
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Removing a skill that is not on the list is a no-op.
pub(crate) async fn remove_skill(
    pool: &SqlitePool,
    user_id: &str,
    skill_id: &str,
    role: SkillRole,
) -> AppResult<()> {
    sqlx::query("DELETE FROM user_skills WHERE user_id = ? AND skill_id = ? AND role = ?")
        .bind(user_id)
        .bind(skill_id)
        .bind(role)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileSkillBody {
    skill_id: String,
    #[serde(rename = "type")]
    role: SkillRole,
}

async fn profile_payload(pool: &SqlitePool, user_id: &str) -> AppResult<serde_json::Value> {
    let skills_to_teach = skills_for(pool, user_id, SkillRole::Teach).await?;
    let skills_to_learn = skills_for(pool, user_id, SkillRole::Learn).await?;
    Ok(json!({
        "skillsToTeach": skills_to_teach,
        "skillsToLearn": skills_to_learn,
    }))
}

#[debug_handler]
pub(crate) async fn add_to_user(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    AppJson(body): AppJson<ProfileSkillBody>,
) -> AppResult<Response> {
    if catalog::by_id(&db_pool, &body.skill_id).await?.is_none() {
        return Err(AppError::not_found("Skill not found"));
    }

    add_skill(&db_pool, &user.user_id, &body.skill_id, body.role).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Skill added to your {} list", body.role.as_str()),
        "user": profile_payload(&db_pool, &user.user_id).await?,
    }))
    .into_response())
}

#[debug_handler]
pub(crate) async fn remove_from_user(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    AppJson(body): AppJson<ProfileSkillBody>,
) -> AppResult<Response> {
    remove_skill(&db_pool, &user.user_id, &body.skill_id, body.role).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Skill removed from your {} list", body.role.as_str()),
        "user": profile_payload(&db_pool, &user.user_id).await?,
    }))
    .into_response())
}
