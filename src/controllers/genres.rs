use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    controllers::{created, db_error, fail, ok, validation_error, ApiResult},
    middleware::AdminUser,
    models::Genre,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/genres", get(list_genres))
        .route("/genres", post(create_genre))
        .route("/genres/{id}", get(get_genre))
        .route("/genres/{id}", put(update_genre))
        .route("/genres/{id}", delete(delete_genre))
}

// GET /api/genres
async fn list_genres(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Genre>> {
    Ok(ok("Genres", state.cache.get_genres().await))
}

// GET /api/genres/{id} - includes the stalls exhibiting this genre
async fn get_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let genre = sqlx::query_as::<_, Genre>(
        "SELECT id, name, description FROM genres WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| db_error("get_genre", e))?
    .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Genre not found"))?;

    let stall_ids = sqlx::query_scalar::<_, i64>(
        "SELECT stall_id FROM stall_genres WHERE genre_id = $1 ORDER BY stall_id",
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| db_error("get_genre", e))?;

    let mut body = json!(genre);
    body["stallIds"] = json!(stall_ids);

    Ok(ok("Genre", body))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenreRequest {
    #[validate(length(min = 1, max = 64, message = "name must be 1-64 characters"))]
    pub name: String,
    pub description: Option<String>,
}

// POST /api/genres
async fn create_genre(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<GenreRequest>,
) -> ApiResult<Genre> {
    req.validate().map_err(|e| validation_error(&e))?;

    let genre = sqlx::query_as::<_, Genre>(
        "INSERT INTO genres (name, description) VALUES ($1, $2)
         RETURNING id, name, description",
    )
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| db_error("create_genre", e))?;

    state.cache.invalidate_genres().await;
    Ok(created("Genre created", genre))
}

// PUT /api/genres/{id}
async fn update_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    _admin: AdminUser,
    Json(req): Json<GenreRequest>,
) -> ApiResult<Genre> {
    req.validate().map_err(|e| validation_error(&e))?;

    let genre = sqlx::query_as::<_, Genre>(
        "UPDATE genres SET name = $2, description = $3 WHERE id = $1
         RETURNING id, name, description",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| db_error("update_genre", e))?
    .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Genre not found"))?;

    state.cache.invalidate_genres().await;
    Ok(ok("Genre updated", genre))
}

// DELETE /api/genres/{id}
async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    _admin: AdminUser,
) -> ApiResult<serde_json::Value> {
    let deleted = sqlx::query("DELETE FROM genres WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| db_error("delete_genre", e))?
        .rows_affected();

    if deleted == 0 {
        return Err(fail(StatusCode::NOT_FOUND, "Genre not found"));
    }

    state.cache.invalidate_genres().await;
    Ok(ok("Genre deleted", json!({ "id": id })))
}
