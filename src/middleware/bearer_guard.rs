//! Bearer-token guard for the mobile API.
//!
//! Verifies the `Authorization: Bearer <jwt>` header and injects the same
//! `AuthUser` extension the cookie guard produces, so handlers are shared
//! between the web and mobile surfaces.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{
    auth::jwt,
    errors::AppError,
    middleware::auth_guard::AuthUser,
    state::AppState,
};

pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = jwt::verify(&state.config.jwt_secret, token)?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        role:    claims.role,
        email:   claims.email,
    });

    Ok(next.run(req).await)
}
