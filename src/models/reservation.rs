use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub client_ref: Option<String>,
    pub user_id: i32,
    pub stall_id: i64,
    pub email: String,
    pub amount: f64,
    pub status: String,
    pub reserved_at: NaiveDateTime,
    pub confirmed_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
}

impl Reservation {
    pub fn is_valid_status(status: &str) -> bool {
        matches!(status, "PENDING" | "CONFIRMED" | "CANCELLED")
    }

    // PENDING and CONFIRMED both count against the per-user cap.
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "PENDING" | "CONFIRMED")
    }

    pub fn can_confirm(&self) -> bool {
        self.status == "PENDING"
    }

    pub fn can_cancel(&self) -> bool {
        self.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(status: &str) -> Reservation {
        Reservation {
            id: Uuid::nil(),
            client_ref: None,
            user_id: 1,
            stall_id: 1,
            email: "vendor@example.com".to_string(),
            amount: 15000.0,
            status: status.to_string(),
            reserved_at: NaiveDateTime::default(),
            confirmed_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn active_statuses_count_against_cap() {
        assert!(reservation("PENDING").is_active());
        assert!(reservation("CONFIRMED").is_active());
        assert!(!reservation("CANCELLED").is_active());
    }

    #[test]
    fn only_pending_can_confirm() {
        assert!(reservation("PENDING").can_confirm());
        assert!(!reservation("CONFIRMED").can_confirm());
        assert!(!reservation("CANCELLED").can_confirm());
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(!reservation("CANCELLED").can_cancel());
        assert!(reservation("CONFIRMED").can_cancel());
    }
}
