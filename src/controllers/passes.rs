//! passes.rs
//!
//! Entry-pass issuance and venue-gate verification.
//!
//! A vendor with a CONFIRMED reservation downloads a pass: the QR payload
//! `STALL-<stallName>-RES-<reservationId>` plus a detached signature. At
//! the venue the admin scanner posts whatever it decoded; the payload is
//! checked against the signature and then against the database. While a
//! camera keeps decoding the same code frame after frame, the verdict is
//! replayed from the per-scanner store instead of re-verified, until the
//! scanner is reset.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    controllers::{db_error, fail, ok, ApiResult},
    middleware::{AdminUser, AuthUser},
    services::passes::{format_payload, parse_payload, sign_payload, verify_signature},
    services::scanner::ScanVerdict,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/passes/{reservation_id}", get(issue_pass))
        .route("/passes/verify", post(verify_pass))
        .route("/passes/verify/reset", post(reset_scanner))
}

const DEFAULT_SCANNER: &str = "default";

/* ---------- ISSUANCE ---------- */

#[derive(Debug, Serialize)]
struct PassResponse {
    payload: String,
    signature: String,
    #[serde(rename = "stallName")]
    stall_name: String,
    #[serde(rename = "reservationId")]
    reservation_id: Uuid,
}

// GET /api/passes/{reservation_id} - owner or admin
async fn issue_pass(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<PassResponse> {
    let row: Option<(i32, String, String)> = sqlx::query_as(
        "SELECT r.user_id, r.status, s.name
         FROM reservations r
         JOIN stalls s ON s.id = r.stall_id
         WHERE r.id = $1",
    )
    .bind(reservation_id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| db_error("issue_pass", e))?;

    let (owner_id, status, stall_name) =
        row.ok_or_else(|| fail(StatusCode::NOT_FOUND, "Reservation not found"))?;

    if owner_id != user.user_id && !user.is_employee() {
        return Err(fail(StatusCode::FORBIDDEN, "Not your reservation"));
    }
    if status != "CONFIRMED" {
        return Err(fail(
            StatusCode::CONFLICT,
            "Entry pass is only issued for confirmed reservations",
        ));
    }

    let payload = format_payload(&stall_name, reservation_id);
    let signature = sign_payload(&payload, &state.config.reservation.pass_secret);

    Ok(ok(
        "Entry pass",
        PassResponse {
            payload,
            signature,
            stall_name,
            reservation_id,
        },
    ))
}

/* ---------- VERIFICATION ---------- */

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub payload: String,
    pub signature: Option<String>,
    #[serde(rename = "scannerId")]
    pub scanner_id: Option<String>,
}

// POST /api/passes/verify
async fn verify_pass(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<ScanVerdict> {
    let scanner_id = req.scanner_id.as_deref().unwrap_or(DEFAULT_SCANNER);

    // Same code still in front of the camera: replay, don't re-verify
    if let Some(verdict) = state.scanners.replay(scanner_id, &req.payload) {
        return Ok(ok("Verification (replayed)", verdict));
    }

    let verdict = build_verdict(&state, &req).await?;
    state.scanners.record(scanner_id, &req.payload, &verdict);

    Ok(ok("Verification", verdict))
}

async fn build_verdict(
    state: &Arc<AppState>,
    req: &VerifyRequest,
) -> Result<ScanVerdict, crate::controllers::ApiError> {
    if let Some(ref signature) = req.signature {
        if verify_signature(&req.payload, signature, &state.config.reservation.pass_secret)
            .is_err()
        {
            return Ok(invalid("Pass signature mismatch"));
        }
    } else {
        // Passes issued before signing shipped; the database check decides
        warn!("Unsigned pass presented: {}", req.payload);
    }

    let pass = match parse_payload(&req.payload) {
        Ok(pass) => pass,
        Err(e) => return Ok(invalid(&e.to_string())),
    };

    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT r.status, s.name
         FROM reservations r
         JOIN stalls s ON s.id = r.stall_id
         WHERE r.id = $1",
    )
    .bind(pass.reservation_id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| db_error("verify_pass", e))?;

    let verdict = match row {
        None => invalid("No such reservation"),
        Some((status, _)) if status != "CONFIRMED" => invalid("Reservation is not confirmed"),
        Some((_, stall_name)) if stall_name != pass.stall_name => {
            invalid("Stall name does not match the reservation")
        }
        Some(_) => ScanVerdict {
            valid: true,
            reservation_id: Some(pass.reservation_id),
            stall_name: Some(pass.stall_name.clone()),
            message: "Entry pass is valid".to_string(),
        },
    };

    Ok(verdict)
}

fn invalid(message: &str) -> ScanVerdict {
    ScanVerdict {
        valid: false,
        reservation_id: None,
        stall_name: None,
        message: message.to_string(),
    }
}

/* ---------- RESET ---------- */

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(rename = "scannerId")]
    pub scanner_id: Option<String>,
}

// POST /api/passes/verify/reset
async fn reset_scanner(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<ResetRequest>,
) -> ApiResult<serde_json::Value> {
    let scanner_id = req.scanner_id.as_deref().unwrap_or(DEFAULT_SCANNER);
    state.scanners.reset(scanner_id);

    Ok(ok("Scanner reset", json!({ "scannerId": scanner_id })))
}
