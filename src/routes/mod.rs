use axum::{middleware, Router};
use crate::{
    middleware::{auth_guard::require_auth, bearer_guard::require_bearer, role_guard},
    state::AppState,
};

mod admins;
mod auth;
pub(crate) mod chats;
mod likes;
mod mobile;
mod notifications;
mod posts;
mod programs;
pub(crate) mod schedules;
mod trainers;
mod users;

/// Build the full `/api` router.
///
/// Public auth routes (web login and the mobile token endpoints) are left
/// unprotected. The web surface sits behind the session cookie guard and the
/// mobile surface behind the bearer guard; both inject the same `AuthUser`
/// extension so handlers can be shared.
pub fn all_routes(state: AppState) -> Router<AppState> {
    let cookie_mw = middleware::from_fn_with_state(state.clone(), require_auth);
    let bearer_mw = middleware::from_fn_with_state(state, require_bearer);
    Router::new()
        .merge(auth::router())
        .merge(mobile::public_router())
        .merge(posts::router())     // public community feed
        .merge(
            Router::new()
                .merge(schedules::router())
                .merge(chats::router())
                .merge(notifications::router())
                .merge(likes::router())
                .merge(programs::router())
                .merge(users::router())
                .merge(trainers::router().route_layer(middleware::from_fn(role_guard::require_admin)))
                .merge(admins::router().route_layer(middleware::from_fn(role_guard::require_staff)))
                .route_layer(cookie_mw),
        )
        .merge(mobile::router().route_layer(bearer_mw))
}

/// Offset for a 1-based page, widened to `u64` so an extreme `page`
/// value cannot overflow the multiplication.
pub(crate) fn page_offset(page: u32, limit: u32) -> u64 {
    (u64::from(page.max(1)) - 1) * u64::from(limit)
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(0, 10), 0);
    }

    #[test]
    fn page_offset_survives_extreme_pages() {
        assert_eq!(
            page_offset(u32::MAX, 100),
            (u64::from(u32::MAX) - 1) * 100,
        );
    }
}
