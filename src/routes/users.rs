//! `/users` routes — member listing, stats, self-service profile, and
//! staff edits.

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::{hash_password, verify_password},
    errors::{AppError, AppResult},
    middleware::auth_guard::AuthUser,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users",            get(list_users))
        .route("/users/stats",      get(user_stats))
        .route("/users/me/details", get(me_details))
        .route("/users/me",         put(update_me))
        .route("/users/{id}",       put(update_user).delete(delete_user))
}

// ── Row / body types ─────────────────────────────────────────

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserListRow {
    id:           String,
    name:         String,
    email:        String,
    status:       String,
    membership:   Option<String>,
    image:        Option<String>,
    role:         String,
    created_at:   NaiveDateTime,
    trainer_id:   Option<String>,
    trainer_name: Option<String>,
}

#[derive(Deserialize)]
struct ListQuery {
    page:   Option<u32>,
    limit:  Option<u32>,
    search: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMeBody {
    name:                Option<String>,
    email:               Option<String>,
    bio:                 Option<String>,
    email_notifications: Option<bool>,
    sms_notifications:   Option<bool>,
    current_password:    Option<String>,
    new_password:        Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserBody {
    name:       Option<String>,
    email:      Option<String>,
    membership: Option<String>,
    status:     Option<String>,
    phone:      Option<String>,
    trainer_id: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────

/// Paginated USER listing with name/email search and status filter.
async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<serde_json::Value>> {
    if !caller.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let pool   = &state.pool;
    let page   = query.page.unwrap_or(1).max(1);
    let limit  = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = super::page_offset(page, limit);
    let search = query.search.unwrap_or_default();
    let status = query.status.unwrap_or_default();
    let like   = format!("%{search}%");

    let rows: Vec<UserListRow> = sqlx::query_as::<_, UserListRow>(
        "SELECT u.id, u.name, u.email, u.status, u.membership, u.image, u.role,
                u.created_at, u.trainer_id, t.name AS trainer_name
         FROM users u
         LEFT JOIN users t ON t.id = u.trainer_id
         WHERE u.role = 'USER'
           AND (? = '' OR u.name LIKE ? OR u.email LIKE ?)
           AND (? = '' OR u.status = ?)
         ORDER BY u.created_at DESC
         LIMIT ? OFFSET ?",
    )
    .bind(&search).bind(&like).bind(&like)
    .bind(&status).bind(&status)
    .bind(limit).bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users u
         WHERE u.role = 'USER'
           AND (? = '' OR u.name LIKE ? OR u.email LIKE ?)
           AND (? = '' OR u.status = ?)",
    )
    .bind(&search).bind(&like).bind(&like)
    .bind(&status).bind(&status)
    .fetch_one(pool)
    .await?;

    Ok(Json(json!({
        "users": rows,
        "pagination": {
            "total": total,
            "page": page,
            "limit": limit,
            "totalPages": (total as u64).div_ceil(limit as u64),
        },
    })))
}

async fn user_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    if !caller.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'USER'")
        .fetch_one(pool).await?;
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role = 'USER' AND status = 'ACTIVE'",
    )
    .fetch_one(pool).await?;
    let inactive: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role = 'USER' AND status = 'INACTIVE'",
    )
    .fetch_one(pool).await?;
    // New members this calendar month.
    let new_users: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users
         WHERE role = 'USER'
           AND created_at >= DATE_FORMAT(UTC_TIMESTAMP(), '%Y-%m-01')",
    )
    .fetch_one(pool).await?;

    Ok(Json(json!({
        "totalUsers":    total,
        "activeUsers":   active,
        "inactiveUsers": inactive,
        "newUsers":      new_users,
    })))
}

/// The caller's profile plus their clients (for trainers) with program
/// progress attached.
async fn me_details(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    #[derive(sqlx::FromRow, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ProfileRow {
        id:                  String,
        name:                String,
        email:               String,
        bio:                 Option<String>,
        email_notifications: bool,
        sms_notifications:   bool,
    }

    #[derive(sqlx::FromRow, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ClientRow {
        id:               String,
        name:             String,
        email:            String,
        current_progress: Option<i32>,
        program_status:   Option<String>,
    }

    let profile: ProfileRow = sqlx::query_as::<_, ProfileRow>(
        "SELECT id, name, email, bio, email_notifications, sms_notifications
         FROM users WHERE id = ?",
    )
    .bind(&caller.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let clients: Vec<ClientRow> = sqlx::query_as::<_, ClientRow>(
        "SELECT u.id, u.name, u.email,
                p.current_progress, p.status AS program_status
         FROM users u
         LEFT JOIN programs p ON p.user_id = u.id
         WHERE u.trainer_id = ?
         ORDER BY u.name",
    )
    .bind(&caller.user_id)
    .fetch_all(pool)
    .await?;

    Ok(Json(json!({
        "id": profile.id,
        "name": profile.name,
        "email": profile.email,
        "bio": profile.bio,
        "emailNotifications": profile.email_notifications,
        "smsNotifications": profile.sms_notifications,
        "clients": clients,
    })))
}

/// Self-service settings. A password change requires the current password
/// when one is set.
async fn update_me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<UpdateMeBody>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    if let Some(new_password) = &body.new_password {
        let existing_hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
                .bind(&caller.user_id)
                .fetch_optional(pool)
                .await?
                .ok_or(AppError::NotFound)?;

        if let Some(hash) = &existing_hash {
            let current = body
                .current_password
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("Current password is required".into()))?;
            verify_password(current, hash)
                .map_err(|_| AppError::BadRequest("Invalid current password".into()))?;
        }

        let new_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&new_hash)
            .bind(&caller.user_id)
            .execute(pool)
            .await?;
    }

    if let Some(v) = &body.name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(v).bind(&caller.user_id).execute(pool).await?;
    }
    if let Some(v) = &body.email {
        sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(v).bind(&caller.user_id).execute(pool).await?;
    }
    if let Some(v) = &body.bio {
        sqlx::query("UPDATE users SET bio = ? WHERE id = ?")
            .bind(v).bind(&caller.user_id).execute(pool).await?;
    }
    if let Some(v) = body.email_notifications {
        sqlx::query("UPDATE users SET email_notifications = ? WHERE id = ?")
            .bind(v).bind(&caller.user_id).execute(pool).await?;
    }
    if let Some(v) = body.sms_notifications {
        sqlx::query("UPDATE users SET sms_notifications = ? WHERE id = ?")
            .bind(v).bind(&caller.user_id).execute(pool).await?;
    }

    #[derive(sqlx::FromRow, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct UpdatedRow {
        id:    String,
        name:  String,
        email: String,
        bio:   Option<String>,
    }

    let row: UpdatedRow = sqlx::query_as::<_, UpdatedRow>(
        "SELECT id, name, email, bio FROM users WHERE id = ?",
    )
    .bind(&caller.user_id)
    .fetch_one(pool)
    .await?;

    Ok(Json(serde_json::to_value(row).map_err(|e| AppError::Internal(e.into()))?))
}

/// Staff edit of a member's account fields.
async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserBody>,
) -> AppResult<Json<serde_json::Value>> {
    if !caller.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(&id).fetch_one(pool).await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    if let Some(v) = &body.name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.email {
        sqlx::query("UPDATE users SET email = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.membership {
        sqlx::query("UPDATE users SET membership = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.status {
        if !matches!(v.as_str(), "ACTIVE" | "INACTIVE") {
            return Err(AppError::BadRequest("Invalid status value".into()));
        }
        sqlx::query("UPDATE users SET status = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.phone {
        sqlx::query("UPDATE users SET phone = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.trainer_id {
        let trainer_id = if v.is_empty() { None } else { Some(v.as_str()) };
        sqlx::query("UPDATE users SET trainer_id = ? WHERE id = ?")
            .bind(trainer_id).bind(&id).execute(pool).await?;
    }

    let row: UserListRow = sqlx::query_as::<_, UserListRow>(
        "SELECT u.id, u.name, u.email, u.status, u.membership, u.image, u.role,
                u.created_at, u.trainer_id, t.name AS trainer_name
         FROM users u
         LEFT JOIN users t ON t.id = u.trainer_id
         WHERE u.id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;

    Ok(Json(serde_json::to_value(row).map_err(|e| AppError::Internal(e.into()))?))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !caller.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({ "message": "User deleted successfully" })))
}
