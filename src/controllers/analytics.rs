//! analytics.rs
//!
//! Occupancy and revenue statistics for the admin dashboard.

use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use sqlx::Row;
use std::sync::Arc;

use crate::{
    controllers::{db_error, ok, ApiResult},
    middleware::AdminUser,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/analytics", get(get_fair_analytics))
}

#[derive(Debug, Serialize)]
struct AnalyticsResponse {
    total_stalls: i32,
    available_stalls: i32,
    reserved_stalls: i32,
    maintenance_stalls: i32,
    pending_reservations: i32,
    confirmed_reservations: i32,
    reserved_revenue: String,
}

// GET /api/analytics
async fn get_fair_analytics(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<AnalyticsResponse> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM stalls)::int as total_stalls,
            (SELECT COUNT(*) FROM stalls WHERE status = 'AVAILABLE')::int as available_stalls,
            (SELECT COUNT(*) FROM stalls WHERE status = 'RESERVED')::int as reserved_stalls,
            (SELECT COUNT(*) FROM stalls WHERE status = 'MAINTENANCE')::int as maintenance_stalls,
            (SELECT COUNT(*) FROM reservations WHERE status = 'PENDING')::int as pending_reservations,
            (SELECT COUNT(*) FROM reservations WHERE status = 'CONFIRMED')::int as confirmed_reservations,
            (SELECT COALESCE(SUM(amount), 0) FROM reservations
              WHERE status = 'CONFIRMED')::float8 as reserved_revenue
        "#,
    )
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| db_error("get_fair_analytics", e))?;

    let reserved_revenue: f64 = row.get("reserved_revenue");

    let response = AnalyticsResponse {
        total_stalls: row.get("total_stalls"),
        available_stalls: row.get("available_stalls"),
        reserved_stalls: row.get("reserved_stalls"),
        maintenance_stalls: row.get("maintenance_stalls"),
        pending_reservations: row.get("pending_reservations"),
        confirmed_reservations: row.get("confirmed_reservations"),
        reserved_revenue: format!("{:.2}", reserved_revenue),
    };

    tracing::info!(
        "Fair analytics: {} stalls, {} reserved, revenue {}",
        response.total_stalls,
        response.reserved_stalls,
        response.reserved_revenue
    );

    Ok(ok("Analytics", response))
}
