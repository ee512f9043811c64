use std::collections::HashSet;

use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use serde_json::json;
use sqlx::{prelude::FromRow, SqlitePool};

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{SkillRef, SkillRole};
use crate::skills::profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Mutual,
    OneWay,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedUser {
    pub id: String,
    pub username: String,
    pub bio: String,
    pub location: String,
}

/// One potential exchange partner. The `you_can_teach` / `they_want_to_learn`
/// pair is only present on mutual matches.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub matched_user: MatchedUser,
    pub you_want_to_learn: SkillRef,
    pub they_can_teach: SkillRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub you_can_teach: Option<SkillRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub they_want_to_learn: Option<SkillRef>,
    pub match_type: MatchType,
}

#[derive(Debug)]
pub enum MatchOutcome {
    /// The requester has no learn skills, so there is nothing to match on.
    NoLearnSkills,
    Found(Vec<MatchCandidate>),
}

/// Search the pool of users for exchange partners.
///
/// For every skill the requester wants to learn, every other user who
/// teaches it becomes a candidate. A candidate is mutual when they in
/// turn want to learn something the requester teaches; the first such
/// skill in the candidate's own list order is the one reported.
pub async fn find_matches(pool: &SqlitePool, user_id: &str) -> AppResult<MatchOutcome> {
    let known = sqlx::query_as::<_, ()>("SELECT 1 FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .is_some();
    if !known {
        return Err(AppError::not_found("User not found"));
    }

    let learn_skills = profile::skills_for(pool, user_id, SkillRole::Learn).await?;
    if learn_skills.is_empty() {
        return Ok(MatchOutcome::NoLearnSkills);
    }
    let teach_ids: HashSet<String> = profile::skill_ids(pool, user_id, SkillRole::Teach)
        .await?
        .into_iter()
        .collect();

    let mut candidates = Vec::new();
    for learn in &learn_skills {
        let learn_ref = SkillRef {
            id: learn.id.clone(),
            name: learn.name.clone(),
        };
        for teacher in teachers_of(pool, &learn.id, user_id).await? {
            let their_learn = profile::skills_for(pool, &teacher.id, SkillRole::Learn).await?;
            let shared = their_learn
                .iter()
                .find(|skill| teach_ids.contains(&skill.id));

            candidates.push(match shared {
                Some(shared) => {
                    let shared_ref = SkillRef {
                        id: shared.id.clone(),
                        name: shared.name.clone(),
                    };
                    MatchCandidate {
                        matched_user: teacher,
                        you_want_to_learn: learn_ref.clone(),
                        they_can_teach: learn_ref.clone(),
                        you_can_teach: Some(shared_ref.clone()),
                        they_want_to_learn: Some(shared_ref),
                        match_type: MatchType::Mutual,
                    }
                }
                None => MatchCandidate {
                    matched_user: teacher,
                    you_want_to_learn: learn_ref.clone(),
                    they_can_teach: learn_ref.clone(),
                    you_can_teach: None,
                    they_want_to_learn: None,
                    match_type: MatchType::OneWay,
                },
            });
        }
    }

    Ok(MatchOutcome::Found(dedup_candidates(candidates)))
}

/// Collapse to one record per matched user. The first record claims the
/// slot and its position; a later mutual record replaces a one-way one
/// in place, while a one-way never displaces a mutual and a second
/// mutual never displaces the first.
fn dedup_candidates(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut unique: Vec<MatchCandidate> = Vec::new();
    for candidate in candidates {
        match unique
            .iter_mut()
            .find(|kept| kept.matched_user.id == candidate.matched_user.id)
        {
            None => unique.push(candidate),
            Some(kept) => {
                if kept.match_type == MatchType::OneWay && candidate.match_type == MatchType::Mutual
                {
                    *kept = candidate;
                }
            }
        }
    }
    unique
}

/// Users teaching `skill_id`, oldest account first.
async fn teachers_of(
    pool: &SqlitePool,
    skill_id: &str,
    exclude_user: &str,
) -> AppResult<Vec<MatchedUser>> {
    Ok(sqlx::query_as::<_, MatchedUser>(
        "SELECT u.id, u.username, u.bio, u.location
         FROM users u JOIN user_skills us ON us.user_id = u.id
         WHERE us.skill_id = ? AND us.role = 'teach' AND u.id != ?
         ORDER BY u.created_at, u.id",
    )
    .bind(skill_id)
    .bind(exclude_user)
    .fetch_all(pool)
    .await?)
}

#[debug_handler]
pub(crate) async fn find(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Response> {
    let body = match find_matches(&db_pool, &user.user_id).await? {
        MatchOutcome::NoLearnSkills => json!({
            "success": true,
            "message": "Add skills you want to learn before searching for matches",
            "matches": [],
        }),
        MatchOutcome::Found(matches) => json!({
            "success": true,
            "message": format!("{} potential matches found", matches.len()),
            "matches": matches,
        }),
    };
    Ok(Json(body).into_response())
}
