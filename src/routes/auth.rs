//! `/auth` routes — registration, cookie-session login, and the Google
//! OAuth callback that stores the calendar token set.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_cookies::{
    cookie::{time::Duration as CookieDuration, SameSite},
    Cookie, Cookies,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{generate_token, hash_password, validate_password_strength, verify_password},
    errors::{AppError, AppResult},
    middleware::auth_guard::{lookup_session, SESSION_COOKIE},
    models::UserRole,
    services::calendar::CalendarService,
    state::AppState,
};

const SESSION_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login",    post(login))
        .route("/auth/logout",   post(logout))
        .route("/auth/me",       get(me))
        .route("/auth/google/callback", get(google_callback))
}

// ── Request / response types ──────────────────────────────────

#[derive(Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 1))]
    name:     String,
    #[validate(email)]
    email:    String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email:    String,
    password: String,
}

#[derive(Serialize)]
struct UserResponse {
    id:    String,
    name:  String,
    email: String,
    role:  UserRole,
}

#[derive(Deserialize)]
struct GoogleCallbackQuery {
    code:  Option<String>,
    error: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id:            String,
    name:          String,
    email:         String,
    password_hash: Option<String>,
    role:          UserRole,
}

// ── Handlers ─────────────────────────────────────────────────

async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !state.config.is_development() {
        validate_password_strength(&body.password)?;
    }

    let pool = &state.pool;
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(&body.email)
        .fetch_one(pool)
        .await?;
    if taken {
        return Err(AppError::BadRequest("Email is already registered".into()));
    }

    let id = Uuid::new_v4().to_string();
    let hash = hash_password(&body.password)?;
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, 'USER', 'ACTIVE', UTC_TIMESTAMP(), UTC_TIMESTAMP())",
    )
    .bind(&id)
    .bind(&body.name)
    .bind(&body.email)
    .bind(&hash)
    .execute(pool)
    .await?;

    open_session(&state, &cookies, &id).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id,
            name:  body.name,
            email: body.email,
            role:  UserRole::User,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<UserResponse>> {
    let pool = &state.pool;
    let row: UserRow = sqlx::query_as::<_, UserRow>(
        "SELECT id, name, email, password_hash, role FROM users WHERE email = ? LIMIT 1",
    )
    .bind(&body.email)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let hash = row.password_hash.as_deref().ok_or(AppError::Unauthorized)?;
    verify_password(&body.password, hash)?;

    open_session(&state, &cookies, &row.id).await?;

    Ok(Json(UserResponse {
        id:    row.id,
        name:  row.name,
        email: row.email,
        role:  row.role,
    }))
}

async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> AppResult<StatusCode> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        sqlx::query("DELETE FROM user_sessions WHERE token = ?")
            .bind(cookie.value())
            .execute(&state.pool)
            .await?;
    }

    let mut expired = Cookie::new(SESSION_COOKIE, "");
    expired.set_path("/");
    expired.set_max_age(CookieDuration::seconds(0));
    cookies.add(expired);

    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<AppState>,
    cookies: Cookies,
) -> AppResult<Json<UserResponse>> {
    let token = cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(AppError::Unauthorized)?;
    let auth = lookup_session(&state, &token).await?;

    let row: UserRow = sqlx::query_as::<_, UserRow>(
        "SELECT id, name, email, password_hash, role FROM users WHERE id = ?",
    )
    .bind(&auth.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(UserResponse {
        id:    row.id,
        name:  row.name,
        email: row.email,
        role:  row.role,
    }))
}

/// Google OAuth callback: exchange the code and persist the token set, then
/// redirect back to the admin sessions page.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> AppResult<Redirect> {
    if let Some(err) = query.error {
        tracing::warn!(error = %err, "Google OAuth callback returned an error");
        return Ok(Redirect::to(&format!(
            "{}/error?message=Authentication%20failed",
            state.config.app_base_url
        )));
    }

    let Some(code) = query.code else {
        return Ok(Redirect::to(&format!(
            "{}/error?message=No%20authorization%20code%20received",
            state.config.app_base_url
        )));
    };

    let calendar = CalendarService::new(&state.pool, &state.config);
    match calendar.exchange_code(&code).await {
        Ok(()) => Ok(Redirect::to(&format!(
            "{}/admin/sessions",
            state.config.app_base_url
        ))),
        Err(err) => {
            tracing::error!(error = ?err, "Google OAuth code exchange failed");
            Ok(Redirect::to(&format!(
                "{}/error?message=Failed%20to%20authenticate%20with%20Google%20Calendar",
                state.config.app_base_url
            )))
        }
    }
}

// ── Session helper ────────────────────────────────────────────

async fn open_session(state: &AppState, cookies: &Cookies, user_id: &str) -> AppResult<()> {
    let token = generate_token();
    sqlx::query(
        "INSERT INTO user_sessions (id, user_id, token, expires_at, created_at)
         VALUES (?, ?, ?, DATE_ADD(UTC_TIMESTAMP(), INTERVAL ? DAY), UTC_TIMESTAMP())",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&token)
    .bind(SESSION_DAYS)
    .execute(&state.pool)
    .await?;

    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(SESSION_DAYS));
    if !state.config.is_development() {
        cookie.set_secure(true);
    }
    cookies.add(cookie);

    Ok(())
}
