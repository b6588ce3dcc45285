//! `/trainers` routes — admin-side trainer management.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    errors::{AppError, AppResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trainers",       get(list_trainers))
        .route("/trainers/stats", get(trainer_stats))
        .route("/trainers/{id}",  put(update_trainer).delete(delete_trainer))
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainerRow {
    id:             String,
    name:           String,
    email:          String,
    status:         String,
    specialization: Option<String>,
    image:          Option<String>,
    rating:         Option<f64>,
    created_at:     NaiveDateTime,
    client_count:   i64,
}

#[derive(Deserialize)]
struct ListQuery {
    page:   Option<u32>,
    limit:  Option<u32>,
    search: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTrainerBody {
    name:           Option<String>,
    email:          Option<String>,
    specialization: Option<String>,
    status:         Option<String>,
    image:          Option<String>,
}

async fn list_trainers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let pool   = &state.pool;
    let page   = query.page.unwrap_or(1).max(1);
    let limit  = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = super::page_offset(page, limit);
    let search = query.search.unwrap_or_default();
    let like   = format!("%{search}%");

    let rows: Vec<TrainerRow> = sqlx::query_as::<_, TrainerRow>(
        "SELECT t.id, t.name, t.email, t.status, t.specialization, t.image,
                t.rating, t.created_at,
                (SELECT COUNT(*) FROM users c WHERE c.trainer_id = t.id) AS client_count
         FROM users t
         WHERE t.role = 'TRAINER'
           AND (? = '' OR t.name LIKE ? OR t.email LIKE ? OR t.specialization LIKE ?)
         ORDER BY t.created_at DESC
         LIMIT ? OFFSET ?",
    )
    .bind(&search).bind(&like).bind(&like).bind(&like)
    .bind(limit).bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users t
         WHERE t.role = 'TRAINER'
           AND (? = '' OR t.name LIKE ? OR t.email LIKE ? OR t.specialization LIKE ?)",
    )
    .bind(&search).bind(&like).bind(&like).bind(&like)
    .fetch_one(pool)
    .await?;

    Ok(Json(json!({
        "trainers":    rows,
        "currentPage": page,
        "totalPages":  (total as u64).div_ceil(limit as u64),
        "totalItems":  total,
    })))
}

async fn trainer_stats(
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'TRAINER'")
        .fetch_one(pool).await?;
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role = 'TRAINER' AND status = 'ACTIVE'",
    )
    .fetch_one(pool).await?;
    let avg_rating: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(rating) FROM users WHERE role = 'TRAINER' AND rating IS NOT NULL",
    )
    .fetch_one(pool).await?;
    let total_clients: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users
         WHERE role = 'USER' AND trainer_id IS NOT NULL",
    )
    .fetch_one(pool).await?;

    Ok(Json(json!({
        "totalTrainers":  total,
        "activeTrainers": active,
        "avgRating":      avg_rating.unwrap_or(0.0),
        "totalClients":   total_clients,
    })))
}

async fn update_trainer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTrainerBody>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND role = 'TRAINER')",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    if let Some(v) = &body.name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.email {
        sqlx::query("UPDATE users SET email = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.specialization {
        sqlx::query("UPDATE users SET specialization = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.status {
        if !matches!(v.as_str(), "ACTIVE" | "INACTIVE") {
            return Err(AppError::BadRequest("Invalid status value".into()));
        }
        sqlx::query("UPDATE users SET status = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }
    if let Some(v) = &body.image {
        sqlx::query("UPDATE users SET image = ? WHERE id = ?").bind(v).bind(&id).execute(pool).await?;
    }

    let row: TrainerRow = sqlx::query_as::<_, TrainerRow>(
        "SELECT t.id, t.name, t.email, t.status, t.specialization, t.image,
                t.rating, t.created_at,
                (SELECT COUNT(*) FROM users c WHERE c.trainer_id = t.id) AS client_count
         FROM users t
         WHERE t.id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;

    Ok(Json(serde_json::to_value(row).map_err(|e| AppError::Internal(e.into()))?))
}

/// Deleting a trainer releases their clients back to the unassigned pool
/// before the row goes away.
async fn delete_trainer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    sqlx::query("UPDATE users SET trainer_id = NULL WHERE trainer_id = ?")
        .bind(&id)
        .execute(pool)
        .await?;

    let result = sqlx::query("DELETE FROM users WHERE id = ? AND role = 'TRAINER'")
        .bind(&id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({ "message": "Trainer deleted successfully" })))
}
