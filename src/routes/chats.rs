//! `/chat` routes — one-to-one user/trainer conversations.
//!
//! A chat is unique per (user, trainer) pair; the unique key in `chats`
//! makes get-or-create safe under concurrent calls. Messages are
//! append-only; clients poll the full list.

use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::Db,
    errors::{AppError, AppResult},
    middleware::auth_guard::AuthUser,
    state::AppState,
};

/// Demo behavior kept from the original seed data: once a chat reaches this
/// many messages, a canned trainer reply is appended.
const AUTO_REPLY_THRESHOLD: i64 = 116;
const AUTO_REPLY_CONTENT: &str = "Hello, I'll reply to you soon.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat",                post(get_or_create_chat))
        .route("/chat/{id}",           get(get_chat))
        .route("/chat/{id}/messages",  get(list_messages).post(send_message))
        .route("/chats/overview",      get(chats_overview))
}

// ── Row types ────────────────────────────────────────────────

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRow {
    id:         String,
    user_id:    String,
    trainer_id: String,
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRow {
    id:           String,
    chat_id:      String,
    sender_id:    String,
    content:      String,
    created_at:   NaiveDateTime,
    sender_name:  String,
    sender_image: Option<String>,
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatOverviewRow {
    id:            String,
    user_id:       String,
    trainer_id:    String,
    user_name:     String,
    user_image:    Option<String>,
    trainer_name:  String,
    trainer_image: Option<String>,
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainerCountRow {
    trainer_name:  String,
    trainer_image: Option<String>,
    user_count:    i64,
}

// ── Request bodies ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatBody {
    trainer_id: String,
}

// Crate-visible: the mobile router mounts `send_message` directly.
#[derive(Deserialize)]
pub(crate) struct SendMessageBody {
    pub(crate) content: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// Return the existing chat for (caller, trainer), creating it when absent.
/// Idempotent per pair: a concurrent duplicate insert hits the unique key
/// and falls back to re-fetching the winner's row.
async fn get_or_create_chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateChatBody>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    let chat = find_or_create_pair(pool, &user.user_id, &body.trainer_id).await?;
    Ok(Json(json!({ "chat": chat })))
}

pub(crate) async fn find_or_create_pair(
    pool: &Db,
    user_id: &str,
    trainer_id: &str,
) -> AppResult<impl Serialize> {
    if let Some(existing) = fetch_pair(pool, user_id, trainer_id).await? {
        return Ok(existing);
    }

    let id = Uuid::new_v4().to_string();
    let insert = sqlx::query(
        "INSERT INTO chats (id, user_id, trainer_id, created_at)
         VALUES (?, ?, ?, UTC_TIMESTAMP())",
    )
    .bind(&id)
    .bind(user_id)
    .bind(trainer_id)
    .execute(pool)
    .await;

    match insert {
        Ok(_) => {}
        // Lost the race: another request created the pair first.
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {}
        Err(err) => return Err(err.into()),
    }

    fetch_pair(pool, user_id, trainer_id)
        .await?
        .ok_or(AppError::NotFound)
}

async fn fetch_pair(pool: &Db, user_id: &str, trainer_id: &str) -> AppResult<Option<ChatRow>> {
    let row = sqlx::query_as::<_, ChatRow>(
        "SELECT id, user_id, trainer_id FROM chats WHERE user_id = ? AND trainer_id = ?",
    )
    .bind(user_id)
    .bind(trainer_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Chat header plus its full message list (participant or admin only).
async fn get_chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    let chat = assert_participant(pool, &id, &user).await?;

    #[derive(sqlx::FromRow, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct CounterpartRow {
        name:  String,
        image: Option<String>,
    }

    let counterpart: CounterpartRow = sqlx::query_as(
        "SELECT name, image FROM users WHERE id = ?",
    )
    .bind(&chat.user_id)
    .fetch_one(pool)
    .await?;

    let messages = fetch_messages(pool, &id).await?;

    Ok(Json(json!({
        "chat": {
            "id":        chat.id,
            "userId":    chat.user_id,
            "trainerId": chat.trainer_id,
            "user":      counterpart,
            "messages":  messages,
        }
    })))
}

/// Full replace poll: the whole ordered message list, every time.
pub(crate) async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    assert_participant(pool, &id, &user).await?;
    let messages = fetch_messages(pool, &id).await?;
    Ok(Json(json!({ "messages": messages })))
}

pub(crate) async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<SendMessageBody>,
) -> AppResult<Json<serde_json::Value>> {
    if body.content.is_empty() {
        return Err(AppError::BadRequest("Message content is required".into()));
    }

    let pool = &state.pool;
    let chat = assert_participant(pool, &id, &user).await?;

    let message_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
         VALUES (?, ?, ?, ?, UTC_TIMESTAMP(3))",
    )
    .bind(&message_id)
    .bind(&id)
    .bind(&user.user_id)
    .bind(&body.content)
    .execute(pool)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await?;

    if count == AUTO_REPLY_THRESHOLD {
        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
             VALUES (?, ?, ?, ?, UTC_TIMESTAMP(3))",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(&chat.trainer_id)
        .bind(AUTO_REPLY_CONTENT)
        .execute(pool)
        .await?;
    }

    let message: MessageRow = sqlx::query_as::<_, MessageRow>(
        "SELECT m.id, m.chat_id, m.sender_id, m.content, m.created_at,
                u.name AS sender_name, u.image AS sender_image
         FROM messages m
         JOIN users u ON u.id = m.sender_id
         WHERE m.id = ?",
    )
    .bind(&message_id)
    .fetch_one(pool)
    .await?;

    Ok(Json(json!({ "message": message })))
}

/// Admin support view: every chat with participant names, plus the number of
/// distinct users each trainer is talking to.
async fn chats_overview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    if !user.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    let chats: Vec<ChatOverviewRow> = sqlx::query_as::<_, ChatOverviewRow>(
        "SELECT c.id, c.user_id, c.trainer_id,
                u.name AS user_name,    u.image AS user_image,
                t.name AS trainer_name, t.image AS trainer_image
         FROM chats c
         JOIN users u ON u.id = c.user_id
         JOIN users t ON t.id = c.trainer_id
         ORDER BY c.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let counts: Vec<TrainerCountRow> = sqlx::query_as::<_, TrainerCountRow>(
        "SELECT t.name AS trainer_name, t.image AS trainer_image,
                COUNT(DISTINCT c.user_id) AS user_count
         FROM chats c
         JOIN users t ON t.id = c.trainer_id
         GROUP BY c.trainer_id, t.name, t.image",
    )
    .fetch_all(pool)
    .await?;

    Ok(Json(json!({ "chats": chats, "trainerDetailsWithCounts": counts })))
}

// ── Helpers ──────────────────────────────────────────────────

async fn assert_participant(pool: &Db, chat_id: &str, caller: &AuthUser) -> AppResult<ChatRow> {
    let chat: ChatRow = sqlx::query_as::<_, ChatRow>(
        "SELECT id, user_id, trainer_id FROM chats WHERE id = ?",
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    if caller.role.is_admin()
        || chat.user_id == caller.user_id
        || chat.trainer_id == caller.user_id
    {
        Ok(chat)
    } else {
        Err(AppError::Forbidden)
    }
}

pub(crate) async fn fetch_messages(pool: &Db, chat_id: &str) -> AppResult<Vec<impl Serialize>> {
    let messages: Vec<MessageRow> = sqlx::query_as::<_, MessageRow>(
        "SELECT m.id, m.chat_id, m.sender_id, m.content, m.created_at,
                u.name AS sender_name, u.image AS sender_image
         FROM messages m
         JOIN users u ON u.id = m.sender_id
         WHERE m.chat_id = ?
         ORDER BY m.created_at ASC",
    )
    .bind(chat_id)
    .fetch_all(pool)
    .await?;
    Ok(messages)
}
