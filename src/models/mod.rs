#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Users ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id:                  Uuid,
    pub name:                String,
    pub email:               String,
    pub phone:               Option<String>,
    pub password_hash:       Option<String>,
    pub role:                UserRole,
    pub status:              UserStatus,
    pub membership:          Option<String>,
    pub gender:              Option<String>,
    pub birth_date:          Option<NaiveDate>,
    pub bio:                 Option<String>,
    pub image:               Option<String>,
    pub specialization:      Option<String>,
    pub rating:              Option<f64>,
    pub clients_count:       i32,
    pub trainer_id:          Option<Uuid>,
    pub email_notifications: bool,
    pub sms_notifications:   bool,
    pub created_at:          NaiveDateTime,
    pub updated_at:          NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Trainer,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Trainer, admin and super-admin share most back-office endpoints.
    pub fn is_staff(self) -> bool {
        matches!(self, UserRole::Trainer | UserRole::Admin | UserRole::SuperAdmin)
    }

    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::User       => "USER",
            UserRole::Trainer    => "TRAINER",
            UserRole::Admin      => "ADMIN",
            UserRole::SuperAdmin => "SUPER_ADMIN",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

// ── Sessions ─────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSession {
    pub id:         Uuid,
    pub user_id:    Uuid,
    pub token:      String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

// ── Schedules ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schedule {
    pub id:           Uuid,
    pub user_id:      Uuid,
    pub trainer_id:   Uuid,
    pub date:         NaiveDate,
    pub start_time:   NaiveDateTime,
    pub end_time:     NaiveDateTime,
    pub subject:      String,
    pub description:  Option<String>,
    pub link:         Option<String>,
    pub session_type: Option<String>,
    pub status:       ScheduleStatus,
    pub attended:     bool,
    pub created_at:   NaiveDateTime,
    pub updated_at:   NaiveDateTime,
}

/// Session lifecycle: `pending → requested → upcoming → completed`, with
/// `completed` also directly reachable from any state once the session's
/// end time has passed and attendance was recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Requested,
    Upcoming,
    Completed,
}

impl ScheduleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Pending   => "pending",
            ScheduleStatus::Requested => "requested",
            ScheduleStatus::Upcoming  => "upcoming",
            ScheduleStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending"   => Some(ScheduleStatus::Pending),
            "requested" => Some(ScheduleStatus::Requested),
            "upcoming"  => Some(ScheduleStatus::Upcoming),
            "completed" => Some(ScheduleStatus::Completed),
            _ => None,
        }
    }
}

// ── Notifications ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id:          Uuid,
    pub schedule_id: Uuid,
    pub user_id:     Uuid,
    pub trainer_id:  Uuid,
    pub message:     String,
    pub created_at:  NaiveDateTime,
}

// ── Chats / messages ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub id:         Uuid,
    pub user_id:    Uuid,
    pub trainer_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id:         Uuid,
    pub chat_id:    Uuid,
    pub sender_id:  Uuid,
    pub content:    String,
    pub created_at: NaiveDateTime,
}

// ── Programs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Program {
    pub id:               Uuid,
    pub user_id:          Uuid,
    pub current_progress: i32,
    pub status:           ProgramStatus,
    pub wide_status:      WideStatus,
    pub notes:            Option<String>,
    pub updated_at:       NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramStatus {
    InProgress,
    NearComplete,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WideStatus {
    Active,
    Inactive,
}

// ── Likes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id:         Uuid,
    pub post_id:    String,
    pub user_id:    Uuid,
    pub created_at: NaiveDateTime,
}
