pub mod analytics;
pub mod genres;
pub mod passes;
pub mod reservations;
pub mod stalls;
pub mod users;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes(state: &crate::AppState) -> Router<Arc<crate::AppState>> {
    let mut router = Router::new()
        .merge(users::routes())
        .merge(stalls::routes())
        .merge(reservations::routes())
        .merge(genres::routes())
        .merge(passes::routes());

    if state.config.features.enable_analytics {
        router = router.merge(analytics::routes());
    }

    router
}

/* ---------- response envelope ---------- */

// Every route answers { success, message, data? }
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiError = (StatusCode, Json<ApiEnvelope<serde_json::Value>>);
pub type ApiResult<T> = Result<(StatusCode, Json<ApiEnvelope<T>>), ApiError>;

pub fn ok<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiEnvelope<T>>) {
    (
        StatusCode::OK,
        Json(ApiEnvelope {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }),
    )
}

pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiEnvelope<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiEnvelope {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }),
    )
}

pub fn fail(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ApiEnvelope {
            success: false,
            message: message.to_string(),
            data: None,
        }),
    )
}

pub fn db_error(context: &str, e: sqlx::Error) -> ApiError {
    tracing::error!("{} sql error: {:?}", context, e);
    fail(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
}

pub fn validation_error(errors: &validator::ValidationErrors) -> ApiError {
    let detail = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ");

    fail(StatusCode::BAD_REQUEST, &format!("Validation failed: {}", detail))
}

pub fn reservation_error(e: crate::services::reservation::ReservationError) -> ApiError {
    fail(e.status_code(), &e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_has_no_data_field() {
        let (status, Json(body)) = fail(StatusCode::CONFLICT, "Stall is not available");
        assert_eq!(status, StatusCode::CONFLICT);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Stall is not available");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn ok_envelope_wraps_data() {
        let (status, Json(body)) = ok("done", serde_json::json!({"canReserve": true}));
        assert_eq!(status, StatusCode::OK);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["canReserve"], true);
    }
}
