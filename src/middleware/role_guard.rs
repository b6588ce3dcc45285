//! Role-based authorization guards, layered per-router after `require_auth`.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::middleware::auth_guard::AuthUser;
use crate::models::UserRole;

/// Middleware: require TRAINER, ADMIN or SUPER_ADMIN.
pub async fn require_staff(
    Extension(user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.role.is_staff() {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// Middleware: require ADMIN or SUPER_ADMIN.
pub async fn require_admin(
    Extension(user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.role.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// Middleware: require SUPER_ADMIN.
pub async fn require_super_admin(
    Extension(user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.role != UserRole::SuperAdmin {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::from_fn,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn status_for(app: Router) -> StatusCode {
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    fn with_role(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: "user-1".into(),
            role,
            email:   "user@example.com".into(),
        }
    }

    #[tokio::test]
    async fn staff_guard_admits_staff_roles_only() {
        for (role, expected) in [
            (UserRole::User,       StatusCode::FORBIDDEN),
            (UserRole::Trainer,    StatusCode::OK),
            (UserRole::Admin,      StatusCode::OK),
            (UserRole::SuperAdmin, StatusCode::OK),
        ] {
            let app = Router::new()
                .route("/", get(|| async { "ok" }))
                .route_layer(from_fn(require_staff))
                .layer(axum::Extension(with_role(role)));
            assert_eq!(status_for(app).await, expected, "role {role:?}");
        }
    }

    #[tokio::test]
    async fn admin_guard_rejects_trainers() {
        for (role, expected) in [
            (UserRole::User,       StatusCode::FORBIDDEN),
            (UserRole::Trainer,    StatusCode::FORBIDDEN),
            (UserRole::Admin,      StatusCode::OK),
            (UserRole::SuperAdmin, StatusCode::OK),
        ] {
            let app = Router::new()
                .route("/", get(|| async { "ok" }))
                .route_layer(from_fn(require_admin))
                .layer(axum::Extension(with_role(role)));
            assert_eq!(status_for(app).await, expected, "role {role:?}");
        }
    }

    #[tokio::test]
    async fn super_admin_guard_rejects_everyone_else() {
        for (role, expected) in [
            (UserRole::User,       StatusCode::FORBIDDEN),
            (UserRole::Trainer,    StatusCode::FORBIDDEN),
            (UserRole::Admin,      StatusCode::FORBIDDEN),
            (UserRole::SuperAdmin, StatusCode::OK),
        ] {
            let app = Router::new()
                .route("/", get(|| async { "ok" }))
                .route_layer(from_fn(require_super_admin))
                .layer(axum::Extension(with_role(role)));
            assert_eq!(status_for(app).await, expected, "role {role:?}");
        }
    }
}
