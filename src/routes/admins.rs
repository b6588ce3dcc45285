//! `/admins` routes — privileged role assignment.
//!
//! Listing first demotes stale admin accounts: an ADMIN or SUPER_ADMIN with
//! no membership that is still marked ACTIVE gets flipped to INACTIVE so the
//! panel reflects reality.

use axum::{
    extract::{Extension, Path, State},
    middleware::from_fn,
    routing::{delete, get},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    errors::{AppError, AppResult},
    middleware::{auth_guard::AuthUser, role_guard},
    state::AppState,
};

/// The whole router sits behind `require_staff` (layered in `routes::mod`);
/// candidates and demotion additionally require a super admin.
pub fn router() -> Router<AppState> {
    let super_admin_only = Router::new()
        .route("/admins/candidates", get(list_candidates))
        .route("/admins/{id}",       delete(demote_admin))
        .route_layer(from_fn(role_guard::require_super_admin));

    Router::new()
        .route("/admins", get(list_admins).post(assign_role))
        .merge(super_admin_only)
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminRow {
    id:         String,
    name:       String,
    email:      String,
    role:       String,
    status:     String,
    image:      Option<String>,
    created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateRow {
    id:    String,
    name:  String,
    email: String,
    image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignRoleBody {
    id:             String,
    selected_role:  String,
    specialization: Option<String>,
    image:          Option<String>,
}

async fn list_admins(
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    sqlx::query(
        "UPDATE users SET status = 'INACTIVE'
         WHERE role IN ('ADMIN', 'SUPER_ADMIN')
           AND membership IS NULL
           AND status = 'ACTIVE'",
    )
    .execute(pool)
    .await?;

    let rows: Vec<AdminRow> = sqlx::query_as::<_, AdminRow>(
        "SELECT id, name, email, role, status, image, created_at
         FROM users
         WHERE role IN ('ADMIN', 'SUPER_ADMIN')
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(Json(json!({ "admins": rows })))
}

/// Accounts eligible for promotion: plain members and trainers.
async fn list_candidates(
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let rows: Vec<CandidateRow> = sqlx::query_as::<_, CandidateRow>(
        "SELECT id, name, email, image FROM users
         WHERE role IN ('USER', 'TRAINER')
         ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "candidates": rows })))
}

async fn assign_role(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<AssignRoleBody>,
) -> AppResult<Json<serde_json::Value>> {
    if !caller.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let role = match body.selected_role.as_str() {
        "TRAINER" | "ADMIN" | "SUPER_ADMIN" => body.selected_role.as_str(),
        _ => return Err(AppError::BadRequest("Invalid role selection".into())),
    };
    // Only a super admin can mint another super admin.
    if role == "SUPER_ADMIN" && caller.role != crate::models::UserRole::SuperAdmin {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    let result = sqlx::query(
        "UPDATE users
         SET role = ?,
             specialization = COALESCE(?, specialization),
             image = COALESCE(?, image)
         WHERE id = ?",
    )
    .bind(role)
    .bind(&body.specialization)
    .bind(&body.image)
    .bind(&body.id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    let row: AdminRow = sqlx::query_as::<_, AdminRow>(
        "SELECT id, name, email, role, status, image, created_at
         FROM users WHERE id = ?",
    )
    .bind(&body.id)
    .fetch_one(pool)
    .await?;

    Ok(Json(json!({ "message": "Role updated successfully", "user": row })))
}

/// Demotes an admin back to a plain member. Never against your own account.
async fn demote_admin(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if caller.user_id == id {
        return Err(AppError::BadRequest("Cannot demote your own account".into()));
    }

    let result = sqlx::query(
        "UPDATE users SET role = 'USER'
         WHERE id = ? AND role IN ('ADMIN', 'SUPER_ADMIN')",
    )
    .bind(&id)
    .execute(&state.pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({ "message": "Admin demoted successfully" })))
}
