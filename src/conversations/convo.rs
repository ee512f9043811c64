use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::error::{AppError, AppJson, AppResult};
use crate::models::{Conversation, UserRef};

#[derive(Deserialize)]
pub(crate) struct OpenConversationBody {
    participants: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationView {
    id: String,
    participants: Vec<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_message: Option<MessagePreview>,
    last_message_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessagePreview {
    id: String,
    content: String,
    sender: UserRef,
    created_at: DateTime<Utc>,
}

pub(crate) async fn by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Conversation>> {
    Ok(sqlx::query_as::<_, Conversation>(
        "SELECT id, user_a, user_b, last_message_id, last_message_time, created_at
         FROM conversations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// The conversation between two users, whichever way round it was stored.
pub(crate) async fn find_pair(
    pool: &SqlitePool,
    a: &str,
    b: &str,
) -> AppResult<Option<Conversation>> {
    Ok(sqlx::query_as::<_, Conversation>(
        "SELECT id, user_a, user_b, last_message_id, last_message_time, created_at
         FROM conversations
         WHERE (user_a = ? AND user_b = ?) OR (user_a = ? AND user_b = ?)",
    )
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_optional(pool)
    .await?)
}

async fn user_ref(pool: &SqlitePool, id: &str) -> AppResult<Option<UserRef>> {
    Ok(
        sqlx::query_as::<_, UserRef>("SELECT id, username FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

async fn preview(pool: &SqlitePool, message_id: &str) -> AppResult<Option<MessagePreview>> {
    let row = sqlx::query_as::<_, (String, String, String, DateTime<Utc>)>(
        "SELECT id, content, sender_id, created_at FROM messages WHERE id = ?",
    )
    .bind(message_id)
    .fetch_optional(pool)
    .await?;
    let Some((id, content, sender_id, created_at)) = row else {
        return Ok(None);
    };
    let Some(sender) = user_ref(pool, &sender_id).await? else {
        return Ok(None);
    };
    Ok(Some(MessagePreview {
        id,
        content,
        sender,
        created_at,
    }))
}

pub(crate) async fn view(pool: &SqlitePool, convo: Conversation) -> AppResult<ConversationView> {
    let mut participants = Vec::with_capacity(2);
    for id in [&convo.user_a, &convo.user_b] {
        if let Some(user) = user_ref(pool, id).await? {
            participants.push(user);
        }
    }
    let last_message = match &convo.last_message_id {
        Some(message_id) => preview(pool, message_id).await?,
        None => None,
    };
    Ok(ConversationView {
        id: convo.id,
        participants,
        last_message,
        last_message_time: convo.last_message_time,
        created_at: convo.created_at,
    })
}

#[debug_handler]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Response> {
    // Most recently active first; never-used conversations sort last.
    let conversations = sqlx::query_as::<_, Conversation>(
        "SELECT id, user_a, user_b, last_message_id, last_message_time, created_at
         FROM conversations
         WHERE user_a = ? OR user_b = ?
         ORDER BY last_message_time DESC",
    )
    .bind(&user.user_id)
    .bind(&user.user_id)
    .fetch_all(&db_pool)
    .await?;

    let mut views = Vec::with_capacity(conversations.len());
    for convo in conversations {
        views.push(view(&db_pool, convo).await?);
    }

    Ok(Json(json!({ "success": true, "conversations": views })).into_response())
}

#[debug_handler]
pub(crate) async fn open(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    AppJson(body): AppJson<OpenConversationBody>,
) -> AppResult<Response> {
    let [a, b] = body.participants.as_slice() else {
        return Err(AppError::validation("Exactly 2 participants required"));
    };
    if a == b {
        return Err(AppError::validation("Participants must be two different users"));
    }
    if user.user_id != *a && user.user_id != *b {
        return Err(AppError::forbidden(
            "You can only open conversations you participate in",
        ));
    }

    let other = if user.user_id == *a { b } else { a };
    let known = sqlx::query_as::<_, ()>("SELECT 1 FROM users WHERE id = ?")
        .bind(other)
        .fetch_optional(&db_pool)
        .await?
        .is_some();
    if !known {
        return Err(AppError::not_found("User not found"));
    }

    if let Some(existing) = find_pair(&db_pool, a, b).await? {
        let view = view(&db_pool, existing).await?;
        return Ok(Json(json!({ "success": true, "conversation": view })).into_response());
    }

    let created = Conversation {
        id: Uuid::now_v7().to_string(),
        user_a: a.clone(),
        user_b: b.clone(),
        last_message_id: None,
        last_message_time: None,
        created_at: Utc::now(),
    };
    let inserted = sqlx::query(
        "INSERT INTO conversations (id, user_a, user_b, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&created.id)
    .bind(&created.user_a)
    .bind(&created.user_b)
    .bind(created.created_at)
    .execute(&db_pool)
    .await;
    if let Err(err) = inserted {
        // Lost the race to another opener; hand back their row.
        if db::is_unique_violation(&err) {
            if let Some(existing) = find_pair(&db_pool, a, b).await? {
                let view = view(&db_pool, existing).await?;
                return Ok(Json(json!({ "success": true, "conversation": view })).into_response());
            }
        }
        return Err(err.into());
    }

    let view = view(&db_pool, created).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "conversation": view })),
    )
        .into_response())
}
