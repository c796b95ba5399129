use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;

pub struct CleanupService {
    state: Arc<AppState>,
}

impl CleanupService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Reap PENDING reservations that were never approved: cancel them and
    /// put their stalls back on the market.
    pub async fn run_cleanup(&self) {
        info!("🧹 Starting reservation cleanup");

        let ttl_minutes = self.state.config.reservation.pending_ttl_minutes;

        let stale: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT id, stall_id
            FROM reservations
            WHERE status = 'PENDING'
              AND reserved_at < NOW() - make_interval(mins => $1::int)
            "#,
        )
        .bind(ttl_minutes)
        .fetch_all(&self.state.db.pool)
        .await
        .unwrap_or_default();

        if stale.is_empty() {
            info!("No stale pending reservations");
            return;
        }

        info!("Found {} stale pending reservations", stale.len());

        let mut released = 0usize;
        for (reservation_id, stall_id) in stale {
            if self.expire_reservation(reservation_id, stall_id).await {
                released += 1;
            }
        }

        if released > 0 {
            self.state.cache.invalidate_stalls().await;
        }

        info!("✅ Cleanup done, {} reservations expired", released);
    }

    async fn expire_reservation(&self, reservation_id: Uuid, stall_id: i64) -> bool {
        let mut tx = match self.state.db.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!("Failed to start cleanup transaction: {}", e);
                return false;
            }
        };

        let cancelled = sqlx::query(
            "UPDATE reservations SET status = 'CANCELLED', cancelled_at = NOW()
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(reservation_id)
        .execute(&mut *tx)
        .await
        .map(|r| r.rows_affected() > 0)
        .unwrap_or(false);

        if !cancelled {
            // Approved or cancelled while we were looking at it
            let _ = tx.rollback().await;
            return false;
        }

        let _ = sqlx::query(
            "UPDATE stalls SET status = 'AVAILABLE', updated_at = NOW()
             WHERE id = $1 AND status = 'RESERVED'",
        )
        .bind(stall_id)
        .execute(&mut *tx)
        .await;

        if let Err(e) = tx.commit().await {
            error!(
                "Failed to commit cleanup for reservation {}: {:?}",
                reservation_id, e
            );
            return false;
        }

        info!(
            "Expired pending reservation {}, stall {} released",
            reservation_id, stall_id
        );
        true
    }
}
