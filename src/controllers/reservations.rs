use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    controllers::{created, db_error, fail, ok, reservation_error, validation_error, ApiResult},
    middleware::{AdminUser, AuthUser},
    models::Reservation,
    services::reservation::{NewReservation, ReservationService},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reservations", post(create_reservation))
        .route("/reservations", get(list_reservations))
        .route("/reservations/{id}/confirm", put(confirm_reservation))
        .route("/reservations/{id}/cancel", put(cancel_reservation))
}

/* ---------- RESERVATIONS ---------- */

// POST /api/reservations
//
// The confirmation-flow submit. The body keeps the portal's wire shape
// (userId, email, stallId, amount, status, termsAccepted); the server is
// authoritative for the identifier and the timestamps.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReservationRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<i32>,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[serde(rename = "stallId")]
    pub stall_id: i64,
    #[validate(range(min = 0.01, message = "amount must be greater than zero"))]
    pub amount: f64,
    pub status: Option<String>,
    #[serde(rename = "termsAccepted", default)]
    pub terms_accepted: bool,
}

async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReservationRequest>,
) -> ApiResult<Reservation> {
    req.validate().map_err(|e| validation_error(&e))?;

    // The token decides who reserves; a mismatched body userId is rejected
    if let Some(body_user) = req.user_id {
        if body_user != user.user_id {
            return Err(fail(StatusCode::FORBIDDEN, "Cannot reserve for another user"));
        }
    }
    if let Some(ref status) = req.status {
        if status != "CONFIRMED" {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                "status must be CONFIRMED on creation",
            ));
        }
    }

    let service = ReservationService::new(state.clone());
    let reservation = service
        .create(NewReservation {
            user_id: user.user_id,
            stall_id: req.stall_id,
            email: req.email.clone(),
            amount: Some(req.amount),
            client_ref: None,
            initial_status: "CONFIRMED",
            terms_accepted: req.terms_accepted,
        })
        .await
        .map_err(reservation_error)?;

    Ok(created("Reservation confirmed", reservation))
}

// GET /api/reservations
#[derive(Debug, Deserialize)]
struct ReservationsQuery {
    status: Option<String>,
}

async fn list_reservations(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<ReservationsQuery>,
) -> ApiResult<Vec<Reservation>> {
    if let Some(ref status) = params.status {
        if !Reservation::is_valid_status(status) {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                "status must be PENDING | CONFIRMED | CANCELLED",
            ));
        }
    }

    let reservations = match params.status {
        Some(status) => {
            sqlx::query_as::<_, Reservation>(
                "SELECT * FROM reservations WHERE status = $1 ORDER BY reserved_at DESC",
            )
            .bind(status)
            .fetch_all(&state.db.pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Reservation>(
                "SELECT * FROM reservations ORDER BY reserved_at DESC",
            )
            .fetch_all(&state.db.pool)
            .await
        }
    }
    .map_err(|e| db_error("list_reservations", e))?;

    Ok(ok("Reservations", reservations))
}

// PUT /api/reservations/{id}/confirm
async fn confirm_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    _admin: AdminUser,
) -> ApiResult<Reservation> {
    let service = ReservationService::new(state.clone());
    let reservation = service.confirm(id).await.map_err(reservation_error)?;

    Ok(ok("Reservation confirmed", reservation))
}

// PUT /api/reservations/{id}/cancel - admin, or the vendor who holds it
async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Reservation> {
    if !user.is_employee() {
        let owner: Option<i32> =
            sqlx::query_scalar("SELECT user_id FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&state.db.pool)
                .await
                .map_err(|e| db_error("cancel_reservation", e))?;

        match owner {
            Some(owner_id) if owner_id == user.user_id => {}
            Some(_) => return Err(fail(StatusCode::FORBIDDEN, "Not your reservation")),
            None => return Err(fail(StatusCode::NOT_FOUND, "Reservation not found")),
        }
    }

    let service = ReservationService::new(state.clone());
    let reservation = service.cancel(id).await.map_err(reservation_error)?;

    Ok(ok("Reservation cancelled", reservation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_keeps_the_portal_wire_shape() {
        let req: CreateReservationRequest = serde_json::from_str(
            r#"{
                "userId": 7,
                "email": "vendor@example.com",
                "stallId": 12,
                "amount": 15000.0,
                "status": "CONFIRMED",
                "termsAccepted": true
            }"#,
        )
        .unwrap();

        assert_eq!(req.user_id, Some(7));
        assert_eq!(req.stall_id, 12);
        assert_eq!(req.amount, 15000.0);
        assert!(req.terms_accepted);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn missing_terms_checkbox_defaults_to_not_accepted() {
        let req: CreateReservationRequest = serde_json::from_str(
            r#"{ "email": "vendor@example.com", "stallId": 12, "amount": 15000.0 }"#,
        )
        .unwrap();

        // The service refuses this before touching the database
        assert!(!req.terms_accepted);
    }

    #[test]
    fn amount_must_be_positive() {
        let req: CreateReservationRequest = serde_json::from_str(
            r#"{ "email": "vendor@example.com", "stallId": 12, "amount": 0.0 }"#,
        )
        .unwrap();

        assert!(req.validate().is_err());
    }
}
