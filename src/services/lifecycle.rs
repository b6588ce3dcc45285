//! Schedule lifecycle management.
//!
//! A schedule's `status` must stay consistent with `(end_time, attended)`:
//! `completed` is only reached once the end time has passed AND attendance
//! was recorded. Consistency is maintained two ways:
//!
//! - a lazy sweep ([`sweep_completed`]) run before every schedule list/fetch
//!   query — read-triggered convergence, not an event-driven trigger;
//! - an immediate cascade at write time ([`resolve_on_attendance`]) when a
//!   handler records attendance.
//!
//! Both are idempotent; between sweeps, stale statuses can linger until the next read.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::db::Db;
use crate::errors::AppResult;
use crate::models::ScheduleStatus;

/// Mark every schedule whose end time has passed with attendance recorded as
/// completed. Returns the number of rows converged.
///
/// Post-condition: no row exists where
/// `end_time < now AND attended AND status != 'completed'`.
pub async fn sweep_completed(pool: &Db) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE schedules
         SET status = 'completed', updated_at = UTC_TIMESTAMP()
         WHERE end_time < UTC_TIMESTAMP()
           AND attended = 1
           AND status <> 'completed'",
    )
    .execute(pool)
    .await?;

    let affected = result.rows_affected();
    if affected > 0 {
        tracing::debug!(affected, "Schedule status sweep converged rows");
    }
    Ok(affected)
}

/// Status after attendance is recorded: completion cascades immediately when
/// the session already ended, otherwise the current status is kept and the
/// next sweep after `end_time` finishes the job.
pub fn resolve_on_attendance(
    current: ScheduleStatus,
    end_time: NaiveDateTime,
    now: NaiveDateTime,
) -> ScheduleStatus {
    if end_time < now {
        ScheduleStatus::Completed
    } else {
        current
    }
}

/// Delete notifications whose schedule has completed. Run synchronously
/// before every notification read; failures surface as the request error.
pub async fn purge_completed_notifications(pool: &Db) -> AppResult<u64> {
    let result = sqlx::query(
        "DELETE n FROM notifications n
         JOIN schedules s ON s.id = n.schedule_id
         WHERE s.status = 'completed'",
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Insert the booking notification created alongside a new schedule.
///
/// Not wrapped in a transaction with the schedule insert; a failure here
/// surfaces as the request error while the schedule remains.
pub async fn notify_booking(
    pool: &Db,
    schedule_id: &str,
    user_id: &str,
    trainer_id: &str,
    message: &str,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO notifications (id, schedule_id, user_id, trainer_id, message, created_at)
         VALUES (?, ?, ?, ?, ?, UTC_TIMESTAMP())",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(schedule_id)
    .bind(user_id)
    .bind(trainer_id)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}

pub fn booking_message(
    subject: &str,
    date: chrono::NaiveDate,
    start_time: NaiveDateTime,
    user_name: &str,
    trainer_name: &str,
) -> String {
    format!(
        "New schedule created: {subject} on {} at {} for {user_name} with trainer {trainer_name}",
        date.format("%Y-%m-%d"),
        start_time.format("%H:%M"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn attendance_before_end_time_keeps_status() {
        let status = resolve_on_attendance(
            ScheduleStatus::Pending,
            dt("2024-06-01T10:00:00"),
            dt("2024-06-01T09:30:00"),
        );
        assert_eq!(status, ScheduleStatus::Pending);
    }

    #[test]
    fn attendance_after_end_time_completes() {
        let status = resolve_on_attendance(
            ScheduleStatus::Pending,
            dt("2024-06-01T10:00:00"),
            dt("2024-06-01T10:00:01"),
        );
        assert_eq!(status, ScheduleStatus::Completed);
    }

    #[test]
    fn cascade_applies_from_any_state() {
        for current in [
            ScheduleStatus::Pending,
            ScheduleStatus::Requested,
            ScheduleStatus::Upcoming,
        ] {
            let status = resolve_on_attendance(
                current,
                dt("2024-06-01T10:00:00"),
                dt("2024-06-02T00:00:00"),
            );
            assert_eq!(status, ScheduleStatus::Completed);
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let end = dt("2024-06-01T10:00:00");
        let now = dt("2024-06-02T00:00:00");
        let once = resolve_on_attendance(ScheduleStatus::Upcoming, end, now);
        let twice = resolve_on_attendance(once, end, now);
        assert_eq!(once, twice);
    }

    #[test]
    fn booking_message_format() {
        let msg = booking_message(
            "Leg day",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            dt("2024-06-01T09:00:00"),
            "Alice",
            "Bob",
        );
        assert_eq!(
            msg,
            "New schedule created: Leg day on 2024-06-01 at 09:00 for Alice with trainer Bob"
        );
    }
}
