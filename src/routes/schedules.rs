//! `/schedule` routes — session bookings and their lifecycle.
//!
//! Every list/fetch handler runs the lazy status sweep first, so after any
//! fetch-path call no schedule remains with `end_time < now`, attendance
//! recorded, and a non-completed status.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    middleware::auth_guard::AuthUser,
    models::{ScheduleStatus, UserRole},
    services::{calendar::CalendarService, lifecycle},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schedule",                     get(list_schedules).post(create_schedule))
        .route("/schedule/stats",               get(schedule_stats))
        .route("/schedule/today",               get(today_schedules))
        .route("/schedule/weekly",              get(weekly_schedules))
        .route("/schedule/trainer/pending",     get(trainer_pending))
        .route("/schedule/trainer/requested",   get(trainer_requested))
        .route("/schedule/{id}",                axum::routing::put(update_schedule).delete(delete_schedule))
        .route("/schedule/{id}/generate-meet",  post(generate_meet))
}

// ── Row types ────────────────────────────────────────────────

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRow {
    id:           String,
    user_id:      String,
    trainer_id:   String,
    date:         NaiveDate,
    start_time:   NaiveDateTime,
    end_time:     NaiveDateTime,
    subject:      String,
    description:  Option<String>,
    link:         Option<String>,
    session_type: Option<String>,
    status:       ScheduleStatus,
    attended:     bool,
}

#[derive(sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleListRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    schedule:      ScheduleRow,
    user_name:     String,
    user_image:    Option<String>,
    trainer_name:  String,
    trainer_image: Option<String>,
}

pub(crate) const SCHEDULE_COLUMNS: &str =
    "s.id, s.user_id, s.trainer_id, s.date, s.start_time, s.end_time, s.subject,
     s.description, s.link, s.session_type, s.status, s.attended";

// ── Request bodies ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateScheduleBody {
    date:        Option<String>,
    start_time:  Option<String>,
    end_time:    Option<String>,
    subject:     Option<String>,
    description: Option<String>,
    user_id:     Option<String>,
    trainer_id:  Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateScheduleBody {
    date:       Option<String>,
    start_time: Option<String>,
    end_time:   Option<String>,
    subject:    Option<String>,
    trainer_id: Option<String>,
    status:     Option<String>,
    link:       Option<String>,
    attended:   Option<bool>,
}

#[derive(Deserialize)]
struct ListQuery {
    page:   Option<u32>,
    limit:  Option<u32>,
    search: Option<String>,
    status: Option<String>,
}

// ── Time parsing helpers ─────────────────────────────────────

/// Combine a `YYYY-MM-DD` date with a `HH:MM` time.
pub(crate) fn combine_date_and_time(date: &str, time: &str) -> AppResult<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {date}")))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|_| AppError::BadRequest(format!("Invalid time: {time}")))?;
    Ok(date.and_time(time))
}

/// Accept RFC 3339 or a bare `YYYY-MM-DDTHH:MM[:SS]` datetime.
fn parse_datetime(value: &str) -> AppResult<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| AppError::BadRequest(format!("Invalid datetime: {value}")))
}

// ── Handlers ─────────────────────────────────────────────────

/// Staff listing with pagination, subject search and status filter.
async fn list_schedules(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<serde_json::Value>> {
    if !user.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    lifecycle::sweep_completed(pool).await?;

    let page   = query.page.unwrap_or(1).max(1);
    let limit  = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = super::page_offset(page, limit);
    let search = query.search.unwrap_or_default();
    let status = query.status.unwrap_or_default();

    let like = format!("%{search}%");
    let rows: Vec<ScheduleListRow> = sqlx::query_as::<_, ScheduleListRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS},
                u.name AS user_name,    u.image AS user_image,
                t.name AS trainer_name, t.image AS trainer_image
         FROM schedules s
         JOIN users u ON u.id = s.user_id
         JOIN users t ON t.id = s.trainer_id
         WHERE (? = '' OR s.subject LIKE ?)
           AND (? = '' OR s.status = ?)
         ORDER BY s.date DESC, s.start_time ASC
         LIMIT ? OFFSET ?",
    ))
    .bind(&search).bind(&like)
    .bind(&status).bind(&status)
    .bind(limit).bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM schedules s
         WHERE (? = '' OR s.subject LIKE ?)
           AND (? = '' OR s.status = ?)",
    )
    .bind(&search).bind(&like)
    .bind(&status).bind(&status)
    .fetch_one(pool)
    .await?;

    let total_pages = (total as u64).div_ceil(limit as u64);
    Ok(Json(json!({ "schedules": rows, "totalPages": total_pages })))
}

/// Create a booking. Status starts `pending`; a notification describing the
/// booking is inserted as a side effect (not transactional with the insert).
async fn create_schedule(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Json(body): Json<CreateScheduleBody>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let (Some(date), Some(start), Some(end), Some(subject), Some(user_id), Some(trainer_id)) = (
        body.date.as_deref(),
        body.start_time.as_deref(),
        body.end_time.as_deref(),
        body.subject.as_deref(),
        body.user_id.as_deref(),
        body.trainer_id.as_deref(),
    ) else {
        return Err(AppError::BadRequest("Missing required fields".into()));
    };

    let pool = &state.pool;
    let day        = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {date}")))?;
    let start_time = combine_date_and_time(date, start)?;
    let end_time   = combine_date_and_time(date, end)?;

    #[derive(sqlx::FromRow)]
    struct NameRow { name: String }

    let user_name: NameRow = sqlx::query_as("SELECT name FROM users WHERE id = ?")
        .bind(user_id).fetch_optional(pool).await?.ok_or(AppError::NotFound)?;
    let trainer_name: NameRow = sqlx::query_as("SELECT name FROM users WHERE id = ?")
        .bind(trainer_id).fetch_optional(pool).await?.ok_or(AppError::NotFound)?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO schedules (id, user_id, trainer_id, date, start_time, end_time,
                                subject, description, status, attended, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', 0, UTC_TIMESTAMP(), UTC_TIMESTAMP())",
    )
    .bind(&id).bind(user_id).bind(trainer_id)
    .bind(day).bind(start_time).bind(end_time)
    .bind(subject).bind(&body.description)
    .execute(pool)
    .await?;

    let message = lifecycle::booking_message(subject, day, start_time, &user_name.name, &trainer_name.name);
    lifecycle::notify_booking(pool, &id, user_id, trainer_id, &message).await?;

    let row = fetch_schedule(pool, &id).await?;
    Ok((StatusCode::CREATED, Json(json!({ "schedule": row }))))
}

/// Generic field patch. Recording attendance applies the completion cascade
/// when the session has already ended; status overwrites are accepted as-is.
async fn update_schedule(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateScheduleBody>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    let existing = fetch_schedule(pool, &id).await?;

    if let Some(date) = &body.date {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("Invalid date: {date}")))?;
        sqlx::query("UPDATE schedules SET date = ? WHERE id = ?")
            .bind(day).bind(&id).execute(pool).await?;
    }
    if let Some(start) = &body.start_time {
        sqlx::query("UPDATE schedules SET start_time = ? WHERE id = ?")
            .bind(parse_datetime(start)?).bind(&id).execute(pool).await?;
    }
    if let Some(end) = &body.end_time {
        sqlx::query("UPDATE schedules SET end_time = ? WHERE id = ?")
            .bind(parse_datetime(end)?).bind(&id).execute(pool).await?;
    }
    if let Some(subject) = &body.subject {
        sqlx::query("UPDATE schedules SET subject = ? WHERE id = ?")
            .bind(subject).bind(&id).execute(pool).await?;
    }
    if let Some(trainer_id) = &body.trainer_id {
        sqlx::query("UPDATE schedules SET trainer_id = ? WHERE id = ?")
            .bind(trainer_id).bind(&id).execute(pool).await?;
    }
    if let Some(link) = &body.link {
        sqlx::query("UPDATE schedules SET link = ? WHERE id = ?")
            .bind(link).bind(&id).execute(pool).await?;
    }
    if let Some(status) = &body.status {
        let status = ScheduleStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid status: {status}")))?;
        sqlx::query("UPDATE schedules SET status = ? WHERE id = ?")
            .bind(status.as_str()).bind(&id).execute(pool).await?;
    }
    if let Some(attended) = body.attended {
        sqlx::query("UPDATE schedules SET attended = ? WHERE id = ?")
            .bind(attended).bind(&id).execute(pool).await?;

        if attended {
            let resolved = lifecycle::resolve_on_attendance(
                existing.schedule.status,
                existing.schedule.end_time,
                Utc::now().naive_utc(),
            );
            if resolved == ScheduleStatus::Completed {
                sqlx::query("UPDATE schedules SET status = 'completed' WHERE id = ?")
                    .bind(&id).execute(pool).await?;
            }
        }
    }

    let row = fetch_schedule(pool, &id).await?;
    Ok(Json(json!({ "schedule": row })))
}

async fn delete_schedule(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "message": "Schedule deleted successfully" })))
}

async fn schedule_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    if !user.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    lifecycle::sweep_completed(pool).await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedules")
        .fetch_one(pool).await?;
    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedules WHERE status = 'upcoming'")
        .fetch_one(pool).await?;
    let pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedules WHERE status = 'pending'")
        .fetch_one(pool).await?;
    let completed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedules WHERE status = 'completed'")
        .fetch_one(pool).await?;

    let completion_rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    Ok(Json(json!({
        "totalSessions":   total,
        "activeSessions":  active,
        "pendingSessions": pending,
        "completionRate":  completion_rate,
    })))
}

/// Today's sessions where the caller is the user or the trainer.
async fn today_schedules(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    lifecycle::sweep_completed(pool).await?;

    let today = Utc::now().date_naive();
    let rows = fetch_own_in_range(pool, &user.user_id, today, today + Duration::days(1)).await?;
    Ok(Json(json!({ "schedules": rows })))
}

/// This week's sessions (week starting Sunday) for the caller.
async fn weekly_schedules(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;
    lifecycle::sweep_completed(pool).await?;

    let today = Utc::now().date_naive();
    let week_start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    let rows = fetch_own_in_range(pool, &user.user_id, week_start, week_start + Duration::days(7)).await?;
    Ok(Json(json!({ "schedules": rows })))
}

/// Pending sessions of the calling trainer whose end time has passed —
/// awaiting an attendance decision.
async fn trainer_pending(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    if user.role != UserRole::Trainer {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    lifecycle::sweep_completed(pool).await?;

    let rows: Vec<ScheduleListRow> = sqlx::query_as::<_, ScheduleListRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS},
                u.name AS user_name,    u.image AS user_image,
                t.name AS trainer_name, t.image AS trainer_image
         FROM schedules s
         JOIN users u ON u.id = s.user_id
         JOIN users t ON t.id = s.trainer_id
         WHERE s.trainer_id = ?
           AND s.status = 'pending'
           AND s.end_time < UTC_TIMESTAMP()
         ORDER BY s.date DESC, s.start_time ASC",
    ))
    .bind(&user.user_id)
    .fetch_all(pool)
    .await?;

    Ok(Json(json!({ "schedules": rows })))
}

/// Self-service session requests waiting for the trainer's approval.
async fn trainer_requested(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    if user.role != UserRole::Trainer {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;
    lifecycle::sweep_completed(pool).await?;

    let rows: Vec<ScheduleListRow> = sqlx::query_as::<_, ScheduleListRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS},
                u.name AS user_name,    u.image AS user_image,
                t.name AS trainer_name, t.image AS trainer_image
         FROM schedules s
         JOIN users u ON u.id = s.user_id
         JOIN users t ON t.id = s.trainer_id
         WHERE s.trainer_id = ? AND s.status = 'requested'
         ORDER BY s.date DESC, s.start_time ASC",
    ))
    .bind(&user.user_id)
    .fetch_all(pool)
    .await?;

    Ok(Json(json!({ "schedules": rows })))
}

/// Mint a Meet link through the calendar integration and move the schedule
/// to `upcoming`.
async fn generate_meet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !user.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let pool = &state.pool;

    #[derive(sqlx::FromRow)]
    struct MeetRow {
        subject:       String,
        description:   Option<String>,
        start_time:    NaiveDateTime,
        end_time:      NaiveDateTime,
        user_email:    Option<String>,
        trainer_email: Option<String>,
    }

    let row: MeetRow = sqlx::query_as::<_, MeetRow>(
        "SELECT s.subject, s.description, s.start_time, s.end_time,
                u.email AS user_email, t.email AS trainer_email
         FROM schedules s
         JOIN users u ON u.id = s.user_id
         JOIN users t ON t.id = s.trainer_id
         WHERE s.id = ?",
    )
    .bind(&id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let (Some(user_email), Some(trainer_email)) = (row.user_email, row.trainer_email) else {
        return Err(AppError::NotFound);
    };

    let calendar = CalendarService::new(pool, &state.config);
    let tokens = calendar.load_tokens().await?;

    let meet_link = calendar
        .create_meet_event(
            &tokens,
            &id,
            &row.subject,
            row.description.as_deref().unwrap_or("No additional notes"),
            row.start_time,
            row.end_time,
            &[&user_email, &trainer_email, &user.email],
        )
        .await?;

    sqlx::query("UPDATE schedules SET link = ?, status = 'upcoming' WHERE id = ?")
        .bind(&meet_link)
        .bind(&id)
        .execute(pool)
        .await?;

    let schedule = fetch_schedule(pool, &id).await?;
    Ok(Json(json!({
        "message":  "Meeting link generated successfully",
        "schedule": schedule,
        "meetLink": meet_link,
    })))
}

// ── Query helpers ────────────────────────────────────────────

async fn fetch_schedule(pool: &crate::db::Db, id: &str) -> AppResult<ScheduleListRow> {
    sqlx::query_as::<_, ScheduleListRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS},
                u.name AS user_name,    u.image AS user_image,
                t.name AS trainer_name, t.image AS trainer_image
         FROM schedules s
         JOIN users u ON u.id = s.user_id
         JOIN users t ON t.id = s.trainer_id
         WHERE s.id = ?",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)
}

async fn fetch_own_in_range(
    pool: &crate::db::Db,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<ScheduleListRow>> {
    let rows = sqlx::query_as::<_, ScheduleListRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS},
                u.name AS user_name,    u.image AS user_image,
                t.name AS trainer_name, t.image AS trainer_image
         FROM schedules s
         JOIN users u ON u.id = s.user_id
         JOIN users t ON t.id = s.trainer_id
         WHERE (s.user_id = ? OR s.trainer_id = ?)
           AND s.date >= ? AND s.date < ?
         ORDER BY s.start_time ASC",
    ))
    .bind(user_id).bind(user_id)
    .bind(from).bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_date_and_wall_clock_time() {
        let dt = combine_date_and_time("2024-06-01", "09:00").unwrap();
        assert_eq!(dt.to_string(), "2024-06-01 09:00:00");
    }

    #[test]
    fn rejects_malformed_date_or_time() {
        assert!(combine_date_and_time("06/01/2024", "09:00").is_err());
        assert!(combine_date_and_time("2024-06-01", "9am").is_err());
    }

    #[test]
    fn parses_rfc3339_and_bare_datetimes() {
        assert_eq!(
            parse_datetime("2024-06-01T10:00:00Z").unwrap().to_string(),
            "2024-06-01 10:00:00"
        );
        assert_eq!(
            parse_datetime("2024-06-01T10:00").unwrap().to_string(),
            "2024-06-01 10:00:00"
        );
        assert!(parse_datetime("next tuesday").is_err());
    }
}
