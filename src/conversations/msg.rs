use axum::{debug_handler, extract::{Path, Query, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::conversations::convo;
use crate::error::{AppError, AppJson, AppResult};
use crate::models::{Conversation, UserRef};

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

#[derive(Deserialize)]
pub(crate) struct PostMessageBody {
    content: String,
}

#[derive(Deserialize)]
pub(crate) struct MessagesQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageView {
    id: String,
    conversation_id: String,
    sender: UserRef,
    content: String,
    created_at: DateTime<Utc>,
}

async fn participant_conversation(
    pool: &SqlitePool,
    conversation_id: &str,
    user_id: &str,
) -> AppResult<Conversation> {
    let Some(convo) = convo::by_id(pool, conversation_id).await? else {
        return Err(AppError::not_found("Conversation not found"));
    };
    if convo.user_a != user_id && convo.user_b != user_id {
        return Err(AppError::forbidden(
            "You are not a participant in this conversation",
        ));
    }
    Ok(convo)
}

#[debug_handler]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<Response> {
    let convo = participant_conversation(&db_pool, &conversation_id, &user.user_id).await?;

    let page = i64::from(query.page.unwrap_or(1).max(1));
    let limit = i64::from(query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE));
    let offset = (page - 1) * limit;

    // Page backwards from the newest message, then flip the page so the
    // caller always reads oldest to newest.
    let rows = sqlx::query_as::<_, (String, String, String, String, String, DateTime<Utc>)>(
        "SELECT m.id, m.conversation_id, m.content, u.id, u.username, m.created_at
         FROM messages m JOIN users u ON u.id = m.sender_id
         WHERE m.conversation_id = ?
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT ? OFFSET ?",
    )
    .bind(&convo.id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&db_pool)
    .await?;

    let mut messages: Vec<MessageView> = rows
        .into_iter()
        .map(|(id, conversation_id, content, sender_id, sender_username, created_at)| {
            MessageView {
                id,
                conversation_id,
                sender: UserRef {
                    id: sender_id,
                    username: sender_username,
                },
                content,
                created_at,
            }
        })
        .collect();
    messages.reverse();

    Ok(Json(json!({ "success": true, "messages": messages })).into_response())
}

#[debug_handler]
pub(crate) async fn post(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    AppJson(body): AppJson<PostMessageBody>,
) -> AppResult<Response> {
    let convo = participant_conversation(&db_pool, &conversation_id, &user.user_id).await?;

    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Message content is required"));
    }

    let id = Uuid::now_v7().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&convo.id)
    .bind(&user.user_id)
    .bind(content)
    .bind(now)
    .execute(&db_pool)
    .await?;
    sqlx::query("UPDATE conversations SET last_message_id = ?, last_message_time = ? WHERE id = ?")
        .bind(&id)
        .bind(now)
        .bind(&convo.id)
        .execute(&db_pool)
        .await?;

    let sent = MessageView {
        id,
        conversation_id: convo.id,
        sender: UserRef {
            id: user.user_id,
            username: user.username,
        },
        content: content.to_string(),
        created_at: now,
    };
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "sent": sent })),
    )
        .into_response())
}
