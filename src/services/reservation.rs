//! reservation.rs
//!
//! Service layer for the stall reservation workflow: the availability check,
//! the per-user reservation cap, and the status transitions a stall and its
//! reservation go through together. Creation is a single database
//! transaction - the stall row is locked, the cap is re-checked under the
//! user row lock, the reservation is inserted and the stall flipped to
//! RESERVED - so two racing submissions cannot both succeed the way they
//! could when the cap was checked with a separate advisory call.

use axum::http::StatusCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    models::{Reservation, Stall},
    AppState,
};

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Terms and conditions must be accepted")]
    ConsentRequired,
    #[error("Reservation amount must be greater than zero")]
    InvalidAmount,
    #[error("Stall not found")]
    StallNotFound,
    #[error("Stall is not available for reservation")]
    StallUnavailable,
    #[error("Reservation limit reached: {0} active reservations")]
    LimitReached(i64),
    #[error("Reservation not found")]
    NotFound,
    #[error("Reservation status does not allow this transition")]
    InvalidTransition,
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl ReservationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReservationError::ConsentRequired | ReservationError::InvalidAmount => {
                StatusCode::BAD_REQUEST
            }
            ReservationError::StallNotFound | ReservationError::NotFound => StatusCode::NOT_FOUND,
            ReservationError::StallUnavailable
            | ReservationError::LimitReached(_)
            | ReservationError::InvalidTransition => StatusCode::CONFLICT,
            ReservationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Creation input, shared by the portal submit and the stall-side path.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: i32,
    pub stall_id: i64,
    pub email: String,
    // None: charge the stall's listed price
    pub amount: Option<f64>,
    // Client-supplied identifier, kept only as an idempotency hint
    pub client_ref: Option<String>,
    // "CONFIRMED" from the portal flow, "PENDING" from the stall-side path
    pub initial_status: &'static str,
    pub terms_accepted: bool,
}

// The cap rule on its own: a user may hold at most `max` active reservations.
pub fn under_limit(active: i64, max: i64) -> bool {
    active < max
}

// Checks that run before any database work.
pub fn validate_submission(new: &NewReservation) -> Result<(), ReservationError> {
    if !new.terms_accepted {
        return Err(ReservationError::ConsentRequired);
    }
    if let Some(amount) = new.amount {
        if amount <= 0.0 {
            return Err(ReservationError::InvalidAmount);
        }
    }
    Ok(())
}

pub struct ReservationService {
    state: Arc<AppState>,
}

impl ReservationService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn max_active(&self) -> i64 {
        self.state.config.reservation.max_active
    }

    // Advisory check backing GET /stalls/user/{id}/can-reserve. The
    // authoritative check runs again inside create().
    pub async fn can_reserve(&self, user_id: i32) -> Result<bool, ReservationError> {
        let active = self.active_count(user_id).await?;
        Ok(under_limit(active, self.max_active()))
    }

    pub async fn active_count(&self, user_id: i32) -> Result<i64, ReservationError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations
             WHERE user_id = $1 AND status IN ('PENDING', 'CONFIRMED')",
        )
        .bind(user_id)
        .fetch_one(&self.state.db.pool)
        .await?;
        Ok(count)
    }

    pub async fn create(&self, new: NewReservation) -> Result<Reservation, ReservationError> {
        validate_submission(&new)?;

        // Idempotent replay: a resubmitted client_ref returns the
        // reservation it already created.
        if let Some(ref client_ref) = new.client_ref {
            if let Some(existing) = sqlx::query_as::<_, Reservation>(
                "SELECT * FROM reservations WHERE client_ref = $1",
            )
            .bind(client_ref)
            .fetch_optional(&self.state.db.pool)
            .await?
            {
                info!("Reservation replay for client_ref {}", client_ref);
                return Ok(existing);
            }
        }

        let mut tx = self.state.db.pool.begin().await?;

        // Serialize creates per user so the cap cannot be raced past
        sqlx::query("SELECT user_id FROM users WHERE user_id = $1 FOR UPDATE")
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;

        let active = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations
             WHERE user_id = $1 AND status IN ('PENDING', 'CONFIRMED')",
        )
        .bind(new.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if !under_limit(active, self.max_active()) {
            return Err(ReservationError::LimitReached(active));
        }

        // Lock the stall row for the status flip
        let stall = sqlx::query_as::<_, Stall>(
            "SELECT id, name, size, dimension, price, status, pos_x, pos_y
             FROM stalls WHERE id = $1 FOR UPDATE",
        )
        .bind(new.stall_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReservationError::StallNotFound)?;

        if !stall.is_available() {
            return Err(ReservationError::StallUnavailable);
        }

        let amount = new.amount.unwrap_or(stall.price);
        let id = Uuid::new_v4();

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (id, client_ref, user_id, stall_id, email, amount, status,
                                      reserved_at, confirmed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(),
                    CASE WHEN $7 = 'CONFIRMED' THEN NOW() ELSE NULL END)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&new.client_ref)
        .bind(new.user_id)
        .bind(new.stall_id)
        .bind(&new.email)
        .bind(amount)
        .bind(new.initial_status)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE stalls SET status = 'RESERVED', updated_at = NOW() WHERE id = $1")
            .bind(new.stall_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.state.cache.invalidate_stalls().await;
        info!(
            "Reservation {} created for user {} on stall {} ({})",
            reservation.id, new.user_id, stall.name, reservation.status
        );

        Ok(reservation)
    }

    // PENDING -> CONFIRMED, admin approval
    pub async fn confirm(&self, id: Uuid) -> Result<Reservation, ReservationError> {
        let mut tx = self.state.db.pool.begin().await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReservationError::NotFound)?;

        if !reservation.can_confirm() {
            return Err(ReservationError::InvalidTransition);
        }

        let updated = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'CONFIRMED', confirmed_at = NOW()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Reservation {} confirmed", id);

        Ok(updated)
    }

    // Any active reservation -> CANCELLED; the stall goes back on the market
    pub async fn cancel(&self, id: Uuid) -> Result<Reservation, ReservationError> {
        let mut tx = self.state.db.pool.begin().await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReservationError::NotFound)?;

        if !reservation.can_cancel() {
            return Err(ReservationError::InvalidTransition);
        }

        let updated = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'CANCELLED', cancelled_at = NOW()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE stalls SET status = 'AVAILABLE', updated_at = NOW()
             WHERE id = $1 AND status = 'RESERVED'",
        )
        .bind(reservation.stall_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.state.cache.invalidate_stalls().await;
        info!("Reservation {} cancelled, stall {} released", id, reservation.stall_id);

        Ok(updated)
    }

    // Admin-side direct release of a stall, cancelling whatever holds it
    pub async fn release_stall(&self, stall_id: i64) -> Result<(), ReservationError> {
        let mut tx = self.state.db.pool.begin().await?;

        let released = sqlx::query(
            "UPDATE stalls SET status = 'AVAILABLE', updated_at = NOW()
             WHERE id = $1 AND status = 'RESERVED'",
        )
        .bind(stall_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if released == 0 {
            return Err(ReservationError::StallUnavailable);
        }

        sqlx::query(
            "UPDATE reservations SET status = 'CANCELLED', cancelled_at = NOW()
             WHERE stall_id = $1 AND status IN ('PENDING', 'CONFIRMED')",
        )
        .bind(stall_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.state.cache.invalidate_stalls().await;
        info!("Stall {} released", stall_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(terms_accepted: bool, amount: Option<f64>) -> NewReservation {
        NewReservation {
            user_id: 1,
            stall_id: 1,
            email: "vendor@example.com".to_string(),
            amount,
            client_ref: None,
            initial_status: "CONFIRMED",
            terms_accepted,
        }
    }

    #[test]
    fn cap_blocks_fourth_reservation() {
        assert!(under_limit(0, 3));
        assert!(under_limit(2, 3));
        assert!(!under_limit(3, 3));
        assert!(!under_limit(4, 3));
    }

    #[test]
    fn submission_without_consent_is_rejected_before_any_io() {
        let err = validate_submission(&submission(false, Some(15000.0))).unwrap_err();
        assert!(matches!(err, ReservationError::ConsentRequired));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn consented_submission_passes_validation() {
        assert!(validate_submission(&submission(true, Some(15000.0))).is_ok());
        // Listed-price fallback has no amount to validate
        assert!(validate_submission(&submission(true, None)).is_ok());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let err = validate_submission(&submission(true, Some(0.0))).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidAmount));
    }

    #[test]
    fn business_errors_map_to_conflict() {
        assert_eq!(
            ReservationError::LimitReached(3).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ReservationError::StallUnavailable.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ReservationError::StallNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
