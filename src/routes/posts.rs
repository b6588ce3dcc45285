//! `/posts` — community feed proxied from the external content API and
//! annotated with like counts from our store.

use axum::{extract::State, routing::get, Json, Router};

use crate::{errors::AppResult, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/posts", get(list_posts))
}

/// Fetch published posts from the content API and attach a `likes` count to
/// each. An unconfigured content API yields an empty feed.
async fn list_posts(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    if state.config.content_api_url.is_empty() {
        tracing::warn!("CONTENT_API_URL not configured — community feed disabled");
        return Ok(Json(Vec::new()));
    }

    let url = format!("{}/posts", state.config.content_api_url.trim_end_matches('/'));
    let mut posts: Vec<serde_json::Value> = reqwest::Client::new()
        .get(&url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| crate::errors::AppError::Integration(format!("Content API error: {e}")))?
        .json()
        .await?;

    for post in &mut posts {
        let post_id = post
            .get("id")
            .or_else(|| post.get("_id"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string);

        let likes: i64 = match post_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = ?")
                    .bind(&id)
                    .fetch_one(&state.pool)
                    .await?
            }
            None => 0,
        };

        if let Some(obj) = post.as_object_mut() {
            obj.insert("likes".into(), likes.into());
        }
    }

    Ok(Json(posts))
}
