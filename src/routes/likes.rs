//! `/likes` — at-most-one like per (post, user) pair.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/likes", get(has_liked).post(create_like).delete(delete_like))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeQuery {
    post_id: Option<String>,
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeBody {
    post_id: String,
    user_id: String,
}

async fn has_liked(
    State(state): State<AppState>,
    Query(query): Query<LikeQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let (Some(post_id), Some(user_id)) = (query.post_id, query.user_id) else {
        return Err(AppError::BadRequest("Missing postId or userId".into()));
    };

    let liked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM likes WHERE post_id = ? AND user_id = ?)",
    )
    .bind(&post_id)
    .bind(&user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({ "hasLiked": liked })))
}

async fn create_like(
    State(state): State<AppState>,
    Json(body): Json<LikeBody>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    let id = Uuid::new_v4().to_string();
    let insert = sqlx::query(
        "INSERT INTO likes (id, post_id, user_id, created_at)
         VALUES (?, ?, ?, UTC_TIMESTAMP())",
    )
    .bind(&id)
    .bind(&body.post_id)
    .bind(&body.user_id)
    .execute(pool)
    .await;

    match insert {
        Ok(_) => Ok(Json(json!({
            "id": id,
            "postId": body.post_id,
            "userId": body.user_id,
        }))),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(AppError::BadRequest("User has already liked this post".into()))
        }
        Err(err) => Err(err.into()),
    }
}

async fn delete_like(
    State(state): State<AppState>,
    Json(body): Json<LikeBody>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM likes WHERE post_id = ? AND user_id = ?")
        .bind(&body.post_id)
        .bind(&body.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({
        "postId": body.post_id,
        "userId": body.user_id,
    })))
}
