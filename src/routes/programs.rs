//! `/programs` — per-user training-progress records, upserted by trainers.
//!
//! `status` and `wide_status` are derived server-side from the progress
//! value; clients never set them directly.

use axum::{
    extract::{Extension, Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    middleware::auth_guard::AuthUser,
    models::{ProgramStatus, UserRole, WideStatus},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/program",    put(upsert_program))
        .route("/programs/count-active", get(count_active))
}

#[derive(sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgramRow {
    id:               String,
    user_id:          String,
    current_progress: i32,
    status:           ProgramStatus,
    wide_status:      WideStatus,
    notes:            Option<String>,
    updated_at:       chrono::NaiveDateTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertProgramBody {
    current_progress: i32,
    notes:            Option<String>,
}

/// Grading bands: ≤80 in progress, 80–100 exclusive near-complete, 100 done.
pub fn derive_status(progress: i32) -> ProgramStatus {
    if progress <= 80 {
        ProgramStatus::InProgress
    } else if progress < 100 {
        ProgramStatus::NearComplete
    } else {
        ProgramStatus::Completed
    }
}

/// ACTIVE only while strictly between the endpoints.
pub fn derive_wide_status(progress: i32) -> WideStatus {
    if progress > 0 && progress < 100 {
        WideStatus::Active
    } else {
        WideStatus::Inactive
    }
}

async fn upsert_program(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(body): Json<UpsertProgramBody>,
) -> AppResult<Json<ProgramRow>> {
    if caller.role != UserRole::Trainer {
        return Err(AppError::Forbidden);
    }
    if !(0..=100).contains(&body.current_progress) {
        return Err(AppError::BadRequest(
            "currentProgress must be between 0 and 100".into(),
        ));
    }

    let pool = &state.pool;
    let status      = derive_status(body.current_progress);
    let wide_status = derive_wide_status(body.current_progress);

    sqlx::query(
        "INSERT INTO programs (id, user_id, current_progress, status, wide_status, notes)
         VALUES (?, ?, ?, ?, ?, ?)
         ON DUPLICATE KEY UPDATE
             current_progress = VALUES(current_progress),
             status           = VALUES(status),
             wide_status      = VALUES(wide_status),
             notes            = VALUES(notes)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(body.current_progress)
    .bind(status)
    .bind(wide_status)
    .bind(&body.notes)
    .execute(pool)
    .await?;

    let program: ProgramRow = sqlx::query_as::<_, ProgramRow>(
        "SELECT id, user_id, current_progress, status, wide_status, notes, updated_at
         FROM programs WHERE user_id = ?",
    )
    .bind(&user_id)
    .fetch_one(pool)
    .await?;

    Ok(Json(program))
}

async fn count_active(
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM programs WHERE wide_status = 'ACTIVE'",
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({ "activePrograms": count })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grading_bands() {
        assert_eq!(derive_status(0),   ProgramStatus::InProgress);
        assert_eq!(derive_status(50),  ProgramStatus::InProgress);
        assert_eq!(derive_status(80),  ProgramStatus::InProgress);
        assert_eq!(derive_status(81),  ProgramStatus::NearComplete);
        assert_eq!(derive_status(85),  ProgramStatus::NearComplete);
        assert_eq!(derive_status(99),  ProgramStatus::NearComplete);
        assert_eq!(derive_status(100), ProgramStatus::Completed);
    }

    #[test]
    fn wide_status_is_active_strictly_between_endpoints() {
        assert_eq!(derive_wide_status(0),   WideStatus::Inactive);
        assert_eq!(derive_wide_status(1),   WideStatus::Active);
        assert_eq!(derive_wide_status(50),  WideStatus::Active);
        assert_eq!(derive_wide_status(85),  WideStatus::Active);
        assert_eq!(derive_wide_status(99),  WideStatus::Active);
        assert_eq!(derive_wide_status(100), WideStatus::Inactive);
    }

    #[test]
    fn representative_progress_values() {
        for (progress, status, wide) in [
            (0,   ProgramStatus::InProgress,   WideStatus::Inactive),
            (50,  ProgramStatus::InProgress,   WideStatus::Active),
            (85,  ProgramStatus::NearComplete, WideStatus::Active),
            (100, ProgramStatus::Completed,    WideStatus::Inactive),
        ] {
            assert_eq!(derive_status(progress), status);
            assert_eq!(derive_wide_status(progress), wide);
        }
    }
}
