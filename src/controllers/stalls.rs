use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    controllers::{
        created, db_error, fail, ok, reservation_error, validation_error, ApiResult,
    },
    middleware::{AdminUser, AuthUser},
    models::Stall,
    services::reservation::{NewReservation, ReservationService},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stalls", get(list_stalls))
        .route("/stalls", post(create_stall))
        .route("/stalls/available", get(list_available))
        .route("/stalls/size/{size}", get(list_by_size))
        .route("/stalls/price-range", get(list_by_price_range))
        .route("/stalls/user/{id}", get(user_stalls))
        .route("/stalls/user/{id}/can-reserve", get(can_reserve))
        .route("/stalls/{id}", get(get_stall))
        .route("/stalls/{id}", put(update_stall))
        .route("/stalls/{id}", delete(delete_stall))
        .route("/stalls/{id}/availability", get(availability))
        .route("/stalls/{id}/reserve", post(reserve_stall))
        .route("/stalls/{id}/release", post(release_stall))
}

/* ---------- helpers ---------- */

async fn load_stall(pool: &sqlx::PgPool, id: i64) -> sqlx::Result<Option<Stall>> {
    sqlx::query_as::<_, Stall>(
        "SELECT id, name, size, dimension, price, status, pos_x, pos_y
         FROM stalls WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

async fn stall_genre_ids(pool: &sqlx::PgPool, stall_id: i64) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar::<_, i64>(
        "SELECT genre_id FROM stall_genres WHERE stall_id = $1 ORDER BY genre_id",
    )
    .bind(stall_id)
    .fetch_all(pool)
    .await
}

/* ---------- CATALOG ---------- */

// GET /api/stalls
#[derive(Debug, Deserialize)]
struct StallsQuery {
    search: Option<String>,
    size: Option<String>,
    status: Option<String>,
}

async fn list_stalls(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StallsQuery>,
) -> ApiResult<Vec<Stall>> {
    if let Some(ref size) = params.size {
        if !Stall::is_valid_size(size) {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                "size must be SMALL | MEDIUM | LARGE",
            ));
        }
    }
    if let Some(ref status) = params.status {
        if !Stall::is_valid_status(status) {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                "status must be AVAILABLE | RESERVED | MAINTENANCE",
            ));
        }
    }

    // Catalog comes from the cache; the filter predicates are applied in
    // memory the way the portal applied them.
    let stalls: Vec<Stall> = state
        .cache
        .get_stalls()
        .await
        .into_iter()
        .filter(|s| {
            s.matches_filters(
                params.search.as_deref(),
                params.size.as_deref(),
                params.status.as_deref(),
            )
        })
        .collect();

    Ok(ok("Stalls", stalls))
}

// GET /api/stalls/available
async fn list_available(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Stall>> {
    let stalls: Vec<Stall> = state
        .cache
        .get_stalls()
        .await
        .into_iter()
        .filter(|s| s.is_available())
        .collect();

    Ok(ok("Available stalls", stalls))
}

// GET /api/stalls/size/{size}
async fn list_by_size(
    State(state): State<Arc<AppState>>,
    Path(size): Path<String>,
) -> ApiResult<Vec<Stall>> {
    if !Stall::is_valid_size(&size) {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "size must be SMALL | MEDIUM | LARGE",
        ));
    }

    let stalls: Vec<Stall> = state
        .cache
        .get_stalls()
        .await
        .into_iter()
        .filter(|s| s.matches_filters(None, Some(&size), None))
        .collect();

    Ok(ok("Stalls", stalls))
}

// GET /api/stalls/price-range?min=&max=
#[derive(Debug, Deserialize)]
struct PriceRangeQuery {
    min: Option<f64>,
    max: Option<f64>,
}

async fn list_by_price_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PriceRangeQuery>,
) -> ApiResult<Vec<Stall>> {
    let min = params.min.unwrap_or(0.0);
    let max = params.max.unwrap_or(f64::MAX);
    if min < 0.0 || max < min {
        return Err(fail(StatusCode::BAD_REQUEST, "invalid price range"));
    }

    let stalls = sqlx::query_as::<_, Stall>(
        "SELECT id, name, size, dimension, price, status, pos_x, pos_y
         FROM stalls
         WHERE price >= $1 AND price <= $2
         ORDER BY price",
    )
    .bind(min)
    .bind(max)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| db_error("list_by_price_range", e))?;

    Ok(ok("Stalls", stalls))
}

// GET /api/stalls/{id}
async fn get_stall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let stall = load_stall(&state.db.pool, id)
        .await
        .map_err(|e| db_error("get_stall", e))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Stall not found"))?;

    let genre_ids = stall_genre_ids(&state.db.pool, id)
        .await
        .map_err(|e| db_error("get_stall", e))?;

    let mut body = json!(stall);
    body["genreIds"] = json!(genre_ids);

    Ok(ok("Stall", body))
}

// GET /api/stalls/{id}/availability
async fn availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let stall = load_stall(&state.db.pool, id)
        .await
        .map_err(|e| db_error("availability", e))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Stall not found"))?;

    Ok(ok(
        "Availability",
        json!({ "stallId": stall.id, "available": stall.is_available() }),
    ))
}

/* ---------- ADMIN CRUD ---------- */

#[derive(Debug, Deserialize, Validate)]
pub struct StallRequest {
    #[validate(length(min = 1, max = 64, message = "name must be 1-64 characters"))]
    pub name: String,
    pub size: String,
    #[validate(range(min = 0.1, message = "dimension must be positive"))]
    pub dimension: f64,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
    #[serde(rename = "posX", default)]
    pub pos_x: i32,
    #[serde(rename = "posY", default)]
    pub pos_y: i32,
    #[serde(rename = "genreIds")]
    pub genre_ids: Option<Vec<i64>>,
    // Updates only: AVAILABLE <-> MAINTENANCE; RESERVED is owned by the
    // reservation workflow
    pub status: Option<String>,
}

// POST /api/stalls
async fn create_stall(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<StallRequest>,
) -> ApiResult<Stall> {
    req.validate().map_err(|e| validation_error(&e))?;
    if !Stall::is_valid_size(&req.size) {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "size must be SMALL | MEDIUM | LARGE",
        ));
    }

    let mut tx = state
        .db
        .pool
        .begin()
        .await
        .map_err(|e| db_error("create_stall", e))?;

    let stall = sqlx::query_as::<_, Stall>(
        r#"
        INSERT INTO stalls (name, size, dimension, price, status, pos_x, pos_y)
        VALUES ($1, $2, $3, $4, 'AVAILABLE', $5, $6)
        RETURNING id, name, size, dimension, price, status, pos_x, pos_y
        "#,
    )
    .bind(&req.name)
    .bind(&req.size)
    .bind(req.dimension)
    .bind(req.price)
    .bind(req.pos_x)
    .bind(req.pos_y)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| db_error("create_stall", e))?;

    if let Some(ref genre_ids) = req.genre_ids {
        for genre_id in genre_ids {
            sqlx::query("INSERT INTO stall_genres (stall_id, genre_id) VALUES ($1, $2)")
                .bind(stall.id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("create_stall", e))?;
        }
    }

    tx.commit().await.map_err(|e| db_error("create_stall", e))?;
    state.cache.invalidate_stalls().await;

    Ok(created("Stall created", stall))
}

// PUT /api/stalls/{id}
async fn update_stall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    _admin: AdminUser,
    Json(req): Json<StallRequest>,
) -> ApiResult<Stall> {
    req.validate().map_err(|e| validation_error(&e))?;
    if !Stall::is_valid_size(&req.size) {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "size must be SMALL | MEDIUM | LARGE",
        ));
    }
    if let Some(ref status) = req.status {
        if !matches!(status.as_str(), "AVAILABLE" | "MAINTENANCE") {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                "status must be AVAILABLE | MAINTENANCE",
            ));
        }
    }

    let mut tx = state
        .db
        .pool
        .begin()
        .await
        .map_err(|e| db_error("update_stall", e))?;

    // A RESERVED stall keeps its status; releasing goes through the
    // reservation workflow, not the CRUD surface.
    let stall = sqlx::query_as::<_, Stall>(
        r#"
        UPDATE stalls
        SET name = $2, size = $3, dimension = $4, price = $5,
            pos_x = $6, pos_y = $7,
            status = CASE WHEN status = 'RESERVED' THEN status
                          ELSE COALESCE($8, status) END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, size, dimension, price, status, pos_x, pos_y
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.size)
    .bind(req.dimension)
    .bind(req.price)
    .bind(req.pos_x)
    .bind(req.pos_y)
    .bind(&req.status)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| db_error("update_stall", e))?
    .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Stall not found"))?;

    if let Some(ref genre_ids) = req.genre_ids {
        sqlx::query("DELETE FROM stall_genres WHERE stall_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("update_stall", e))?;
        for genre_id in genre_ids {
            sqlx::query("INSERT INTO stall_genres (stall_id, genre_id) VALUES ($1, $2)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("update_stall", e))?;
        }
    }

    tx.commit().await.map_err(|e| db_error("update_stall", e))?;
    state.cache.invalidate_stalls().await;

    Ok(ok("Stall updated", stall))
}

// DELETE /api/stalls/{id}
async fn delete_stall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    _admin: AdminUser,
) -> ApiResult<serde_json::Value> {
    let has_active = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM reservations
         WHERE stall_id = $1 AND status IN ('PENDING', 'CONFIRMED'))",
    )
    .bind(id)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| db_error("delete_stall", e))?;

    if has_active {
        return Err(fail(
            StatusCode::CONFLICT,
            "Stall has an active reservation and cannot be deleted",
        ));
    }

    let deleted = sqlx::query("DELETE FROM stalls WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| db_error("delete_stall", e))?
        .rows_affected();

    if deleted == 0 {
        return Err(fail(StatusCode::NOT_FOUND, "Stall not found"));
    }

    state.cache.invalidate_stalls().await;
    Ok(ok("Stall deleted", json!({ "id": id })))
}

/* ---------- RESERVATION PATHS ---------- */

// POST /api/stalls/{id}/reserve?reservationId=
//
// Historical stall-side creation path. The reservationId the portal used to
// mint from a timestamp is kept only as an idempotency hint; the
// reservation is created PENDING and waits for admin approval.
#[derive(Debug, Deserialize)]
struct ReserveQuery {
    #[serde(rename = "reservationId")]
    reservation_id: Option<String>,
}

async fn reserve_stall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: AuthUser,
    Query(params): Query<ReserveQuery>,
) -> ApiResult<crate::models::Reservation> {
    let service = ReservationService::new(state.clone());
    let reservation = service
        .create(NewReservation {
            user_id: user.user_id,
            stall_id: id,
            email: user.email.clone(),
            amount: None,
            client_ref: params.reservation_id,
            initial_status: "PENDING",
            terms_accepted: true,
        })
        .await
        .map_err(reservation_error)?;

    Ok(created("Stall reserved, awaiting approval", reservation))
}

// POST /api/stalls/{id}/release
async fn release_stall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    _admin: AdminUser,
) -> ApiResult<serde_json::Value> {
    let service = ReservationService::new(state.clone());
    service.release_stall(id).await.map_err(reservation_error)?;

    Ok(ok("Stall released", json!({ "id": id })))
}

/* ---------- PER-USER VIEWS ---------- */

// GET /api/stalls/user/{id}
async fn user_stalls(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    user: AuthUser,
) -> ApiResult<Vec<Stall>> {
    if user.user_id != id && !user.is_employee() {
        return Err(fail(StatusCode::FORBIDDEN, "Not allowed"));
    }

    let stalls = sqlx::query_as::<_, Stall>(
        r#"
        SELECT s.id, s.name, s.size, s.dimension, s.price, s.status, s.pos_x, s.pos_y
        FROM stalls s
        JOIN reservations r ON r.stall_id = s.id
        WHERE r.user_id = $1 AND r.status IN ('PENDING', 'CONFIRMED')
        ORDER BY r.reserved_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| db_error("user_stalls", e))?;

    Ok(ok("User stalls", stalls))
}

// GET /api/stalls/user/{id}/can-reserve
//
// UX hint for the portal; the cap is enforced again inside creation.
#[derive(Debug, Serialize)]
struct CanReserveResponse {
    #[serde(rename = "canReserve")]
    can_reserve: bool,
    #[serde(rename = "activeReservations")]
    active_reservations: i64,
    #[serde(rename = "maxReservations")]
    max_reservations: i64,
}

async fn can_reserve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    user: AuthUser,
) -> ApiResult<CanReserveResponse> {
    if user.user_id != id && !user.is_employee() {
        return Err(fail(StatusCode::FORBIDDEN, "Not allowed"));
    }

    let service = ReservationService::new(state.clone());
    let active = service.active_count(id).await.map_err(reservation_error)?;
    let max = state.config.reservation.max_active;

    Ok(ok(
        "Reservation limit",
        CanReserveResponse {
            can_reserve: active < max,
            active_reservations: active,
            max_reservations: max,
        },
    ))
}
