//! Authentication guard middleware.
//!
//! Reads the `session` cookie, validates it against `user_sessions` in the DB,
//! and injects an `AuthUser` extension into the request for downstream handlers.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    errors::AppError,
    models::UserRole,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "session";

/// Authenticated user extracted from a valid session (or a mobile bearer
/// token — the bearer guard injects the same extension). Downstream handlers
/// use `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role:    UserRole,
    pub email:   String,
}

/// Middleware: require any valid session cookie.
/// On success, inserts `AuthUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(AppError::Unauthorized)?;

    let user = lookup_session(&state, &token).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Resolve a session token to its user. Shared with the handlers in
/// `routes/auth.rs` that run outside the guard (`/auth/me`, `/auth/logout`).
pub async fn lookup_session(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    #[derive(sqlx::FromRow)]
    struct SessionRow {
        id:    String,
        role:  UserRole,
        email: String,
    }

    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT u.id, u.role, u.email
         FROM user_sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token = ?
           AND s.expires_at > UTC_TIMESTAMP()
         LIMIT 1",
    )
    .bind(token)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
    .ok_or(AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id: row.id,
        role:    row.role,
        email:   row.email,
    })
}
