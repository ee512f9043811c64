use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppJson, AppResult};
use crate::models::Skill;

/// Look a skill up by name, inserting it first if absent.
///
/// Returns the catalog row plus whether this call created it. Names are
/// matched case-insensitively, so "guitar" resolves to an existing
/// "Guitar". Two racing callers both end up with the same row; exactly
/// one of them observes `created == true`.
pub(crate) async fn find_or_create(
    pool: &SqlitePool,
    name: &str,
    category: Option<&str>,
) -> AppResult<(Skill, bool)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Skill name is required"));
    }
    let category = category
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .unwrap_or("Other");

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO skills (id, name, category, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(name)
    .bind(category)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let skill = sqlx::query_as::<_, Skill>(
        "SELECT id, name, category, created_at FROM skills WHERE name = ?",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok((skill, inserted.rows_affected() == 1))
}

pub(crate) async fn by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Skill>> {
    Ok(sqlx::query_as::<_, Skill>(
        "SELECT id, name, category, created_at FROM skills WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

pub(crate) async fn all(pool: &SqlitePool) -> AppResult<Vec<Skill>> {
    Ok(sqlx::query_as::<_, Skill>(
        "SELECT id, name, category, created_at FROM skills ORDER BY name",
    )
    .fetch_all(pool)
    .await?)
}

pub(crate) async fn distinct_categories(pool: &SqlitePool) -> AppResult<Vec<String>> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT DISTINCT category FROM skills WHERE category != '' ORDER BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(category,)| category).collect())
}

/// Resolve skill ids to full rows, preserving the input order. Ids that
/// no longer exist in the catalog are dropped silently.
pub(crate) async fn resolve_skill_refs(
    pool: &SqlitePool,
    ids: &[String],
) -> AppResult<Vec<Skill>> {
    let mut skills = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(skill) = by_id(pool, id).await? {
            skills.push(skill);
        }
    }
    Ok(skills)
}

#[derive(Deserialize)]
pub(crate) struct CreateSkillBody {
    name: String,
    category: Option<String>,
}

#[debug_handler]
pub(crate) async fn list(State(db_pool): State<SqlitePool>) -> AppResult<Response> {
    let skills = all(&db_pool).await?;
    Ok(Json(json!({ "success": true, "skills": skills })).into_response())
}

#[debug_handler]
pub(crate) async fn categories(State(db_pool): State<SqlitePool>) -> AppResult<Response> {
    let categories = distinct_categories(&db_pool).await?;
    Ok(Json(json!({ "success": true, "categories": categories })).into_response())
}

#[debug_handler]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    _user: AuthUser,
    AppJson(body): AppJson<CreateSkillBody>,
) -> AppResult<Response> {
    let (skill, created) = find_or_create(&db_pool, &body.name, body.category.as_deref()).await?;
    if !created {
        return Err(AppError::conflict("This skill already exists"));
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Skill created successfully",
            "skill": skill,
        })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn find_or_create_reports_creation_once() {
        let pool = test_pool().await;

        let (first, created) = find_or_create(&pool, "Guitar", Some("Music")).await.unwrap();
        assert!(created);
        assert_eq!(first.name, "Guitar");
        assert_eq!(first.category, "Music");

        let (second, created) = find_or_create(&pool, "Guitar", None).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn lookup_ignores_name_case_and_padding() {
        let pool = test_pool().await;

        let (original, _) = find_or_create(&pool, "Guitar", None).await.unwrap();
        let (resolved, created) = find_or_create(&pool, "  gUiTaR  ", None).await.unwrap();

        assert!(!created);
        assert_eq!(resolved.id, original.id);
        // The first spelling is the one that sticks.
        assert_eq!(resolved.name, "Guitar");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let pool = test_pool().await;

        let err = find_or_create(&pool, "   ", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_category_defaults_to_other() {
        let pool = test_pool().await;

        let (skill, _) = find_or_create(&pool, "Juggling", None).await.unwrap();
        assert_eq!(skill.category, "Other");

        let (skill, _) = find_or_create(&pool, "Whittling", Some("  ")).await.unwrap();
        assert_eq!(skill.category, "Other");
    }

    #[tokio::test]
    async fn listing_sorts_by_name_ignoring_case() {
        let pool = test_pool().await;

        find_or_create(&pool, "guitar", None).await.unwrap();
        find_or_create(&pool, "Chess", None).await.unwrap();
        find_or_create(&pool, "archery", None).await.unwrap();

        let names: Vec<String> = all(&pool).await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["archery", "Chess", "guitar"]);
    }

    #[tokio::test]
    async fn categories_are_distinct_and_sorted() {
        let pool = test_pool().await;

        find_or_create(&pool, "Guitar", Some("Music")).await.unwrap();
        find_or_create(&pool, "Piano", Some("Music")).await.unwrap();
        find_or_create(&pool, "Chess", Some("Games")).await.unwrap();

        let categories = distinct_categories(&pool).await.unwrap();
        assert_eq!(categories, ["Games", "Music"]);
    }

    #[tokio::test]
    async fn resolve_keeps_input_order_and_drops_unknown_ids() {
        let pool = test_pool().await;

        let (guitar, _) = find_or_create(&pool, "Guitar", None).await.unwrap();
        let (chess, _) = find_or_create(&pool, "Chess", None).await.unwrap();

        let ids = vec![chess.id.clone(), "missing".to_string(), guitar.id.clone()];
        let resolved = resolve_skill_refs(&pool, &ids).await.unwrap();

        let names: Vec<&str> = resolved.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Chess", "Guitar"]);
    }
}
