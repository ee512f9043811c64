use axum::{debug_handler, extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{prelude::FromRow, SqlitePool};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::error::{AppError, AppJson, AppResult};
use crate::models::{MatchRequest, MatchStatus};
use crate::skills::catalog;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateMatchBody {
    target_user_id: String,
    skill_offered_id: String,
    skill_requested_id: String,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct SentMatchView {
    id: String,
    target_user: String,
    your_offer: String,
    your_request: String,
    status: MatchStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceivedMatchView {
    id: String,
    from_user: String,
    their_offer: String,
    their_request: String,
    status: MatchStatus,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MatchAction {
    Accept,
    Reject,
}

#[derive(Deserialize)]
pub(crate) struct ResolveBody {
    action: MatchAction,
}

#[debug_handler]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    AppJson(body): AppJson<CreateMatchBody>,
) -> AppResult<Response> {
    if body.target_user_id == user.user_id {
        return Err(AppError::conflict(
            "You cannot send a match request to yourself",
        ));
    }

    let target = sqlx::query_as::<_, (String,)>("SELECT username FROM users WHERE id = ?")
        .bind(&body.target_user_id)
        .fetch_optional(&db_pool)
        .await?;
    let Some((target_username,)) = target else {
        return Err(AppError::not_found("Target user not found"));
    };
    let Some(offered) = catalog::by_id(&db_pool, &body.skill_offered_id).await? else {
        return Err(AppError::not_found("Offered skill not found"));
    };
    let Some(requested) = catalog::by_id(&db_pool, &body.skill_requested_id).await? else {
        return Err(AppError::not_found("Requested skill not found"));
    };

    let id = Uuid::now_v7().to_string();
    let now = Utc::now();
    let inserted = sqlx::query(
        "INSERT INTO match_requests (id, from_user, to_user, skill_offered, skill_requested, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.user_id)
    .bind(&body.target_user_id)
    .bind(&offered.id)
    .bind(&requested.id)
    .bind(MatchStatus::Pending)
    .bind(now)
    .execute(&db_pool)
    .await;
    if let Err(err) = inserted {
        // The pair index holds one row per user pair in either direction.
        if db::is_unique_violation(&err) {
            return Err(AppError::conflict(
                "You already have a match request with this user",
            ));
        }
        return Err(err.into());
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Match request sent successfully",
            "match": {
                "id": id,
                "targetUser": target_username,
                "yourOffer": offered.name,
                "yourRequest": requested.name,
                "status": MatchStatus::Pending,
                "createdAt": now,
            },
        })),
    )
        .into_response())
}

#[debug_handler]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Response> {
    let sent = sqlx::query_as::<_, SentMatchView>(
        "SELECT m.id, u.username AS target_user, so.name AS your_offer, sr.name AS your_request,
                m.status, m.created_at
         FROM match_requests m
         JOIN users u ON u.id = m.to_user
         JOIN skills so ON so.id = m.skill_offered
         JOIN skills sr ON sr.id = m.skill_requested
         WHERE m.from_user = ?
         ORDER BY m.created_at DESC",
    )
    .bind(&user.user_id)
    .fetch_all(&db_pool)
    .await?;

    let received = sqlx::query_as::<_, ReceivedMatchView>(
        "SELECT m.id, u.username AS from_user, so.name AS their_offer, sr.name AS their_request,
                m.status, m.created_at
         FROM match_requests m
         JOIN users u ON u.id = m.from_user
         JOIN skills so ON so.id = m.skill_offered
         JOIN skills sr ON sr.id = m.skill_requested
         WHERE m.to_user = ?
         ORDER BY m.created_at DESC",
    )
    .bind(&user.user_id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(json!({ "success": true, "sent": sent, "received": received })).into_response())
}

#[debug_handler]
pub(crate) async fn resolve(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(match_id): Path<String>,
    AppJson(body): AppJson<ResolveBody>,
) -> AppResult<Response> {
    let request = sqlx::query_as::<_, MatchRequest>(
        "SELECT id, from_user, to_user, skill_offered, skill_requested, status, created_at
         FROM match_requests WHERE id = ?",
    )
    .bind(&match_id)
    .fetch_optional(&db_pool)
    .await?;
    let Some(request) = request else {
        return Err(AppError::not_found("Match request not found"));
    };

    if request.to_user != user.user_id {
        return Err(AppError::forbidden(
            "Only the recipient can accept or reject a match request",
        ));
    }
    if request.status != MatchStatus::Pending {
        return Err(AppError::conflict(format!(
            "This request was already {}",
            request.status.as_str()
        )));
    }

    let (status, message) = match body.action {
        MatchAction::Accept => (MatchStatus::Accepted, "Match request accepted"),
        MatchAction::Reject => (MatchStatus::Rejected, "Match request rejected"),
    };
    sqlx::query("UPDATE match_requests SET status = ? WHERE id = ?")
        .bind(status)
        .bind(&request.id)
        .execute(&db_pool)
        .await?;

    let (from_username,) =
        sqlx::query_as::<_, (String,)>("SELECT username FROM users WHERE id = ?")
            .bind(&request.from_user)
            .fetch_one(&db_pool)
            .await?;

    Ok(Json(json!({
        "success": true,
        "message": message,
        "match": {
            "id": request.id,
            "fromUser": from_username,
            "status": status,
        },
    }))
    .into_response())
}
