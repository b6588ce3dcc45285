//! `/notifications` — booking notifications, role-filtered.
//!
//! The completed-schedule purge runs synchronously before every read; there
//! is no independent notification lifecycle.

use axum::{
    extract::{Extension, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::json;

use crate::{
    errors::AppResult,
    middleware::auth_guard::AuthUser,
    models::UserRole,
    services::lifecycle,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(list_notifications))
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRow {
    id:           String,
    schedule_id:  String,
    user_id:      String,
    trainer_id:   String,
    message:      String,
    created_at:   NaiveDateTime,
    user_name:    String,
    trainer_name: String,
}

const NOTIFICATION_SELECT: &str =
    "SELECT n.id, n.schedule_id, n.user_id, n.trainer_id, n.message, n.created_at,
            u.name AS user_name, t.name AS trainer_name
     FROM notifications n
     JOIN users u ON u.id = n.user_id
     JOIN users t ON t.id = n.trainer_id";

/// Admins see everything, trainers their own, users their own.
async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    lifecycle::purge_completed_notifications(pool).await?;

    let rows: Vec<NotificationRow> = match user.role {
        UserRole::Admin | UserRole::SuperAdmin => {
            sqlx::query_as::<_, NotificationRow>(&format!(
                "{NOTIFICATION_SELECT} ORDER BY n.created_at DESC",
            ))
            .fetch_all(pool)
            .await?
        }
        UserRole::Trainer => {
            sqlx::query_as::<_, NotificationRow>(&format!(
                "{NOTIFICATION_SELECT} WHERE n.trainer_id = ? ORDER BY n.created_at DESC",
            ))
            .bind(&user.user_id)
            .fetch_all(pool)
            .await?
        }
        UserRole::User => {
            sqlx::query_as::<_, NotificationRow>(&format!(
                "{NOTIFICATION_SELECT} WHERE n.user_id = ? ORDER BY n.created_at DESC",
            ))
            .bind(&user.user_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(Json(json!({ "notifications": rows })))
}
