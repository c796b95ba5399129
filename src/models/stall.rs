use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Stall {
    pub id: i64,
    pub name: String,
    pub size: String,
    pub dimension: f64,
    pub price: f64,
    pub status: String,
    pub pos_x: i32,
    pub pos_y: i32,
}

impl Stall {
    pub fn is_valid_size(size: &str) -> bool {
        matches!(size, "SMALL" | "MEDIUM" | "LARGE")
    }

    pub fn is_valid_status(status: &str) -> bool {
        matches!(status, "AVAILABLE" | "RESERVED" | "MAINTENANCE")
    }

    pub fn is_available(&self) -> bool {
        self.status == "AVAILABLE"
    }

    // Catalog filters compose conjunctively; None means "don't care".
    // Search matches the stall name, case-insensitive.
    pub fn matches_filters(
        &self,
        search: Option<&str>,
        size: Option<&str>,
        status: Option<&str>,
    ) -> bool {
        if let Some(q) = search {
            if !q.is_empty() && !self.name.to_lowercase().contains(&q.to_lowercase()) {
                return false;
            }
        }
        if let Some(s) = size {
            if self.size != s {
                return false;
            }
        }
        if let Some(st) = status {
            if self.status != st {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stall(name: &str, size: &str, status: &str) -> Stall {
        Stall {
            id: 1,
            name: name.to_string(),
            size: size.to_string(),
            dimension: 9.0,
            price: 15000.0,
            status: status.to_string(),
            pos_x: 0,
            pos_y: 0,
        }
    }

    #[test]
    fn size_and_status_filters_compose() {
        let stalls = vec![
            stall("A1", "LARGE", "AVAILABLE"),
            stall("A2", "LARGE", "RESERVED"),
            stall("B1", "SMALL", "AVAILABLE"),
            stall("B2", "MEDIUM", "MAINTENANCE"),
        ];

        let hits: Vec<&Stall> = stalls
            .iter()
            .filter(|s| s.matches_filters(None, Some("LARGE"), Some("AVAILABLE")))
            .collect();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "A1");
    }

    #[test]
    fn search_is_case_insensitive() {
        let s = stall("Fiction Corner A1", "SMALL", "AVAILABLE");
        assert!(s.matches_filters(Some("fiction"), None, None));
        assert!(s.matches_filters(Some("A1"), None, None));
        assert!(!s.matches_filters(Some("poetry"), None, None));
    }

    #[test]
    fn empty_search_matches_everything() {
        let s = stall("A1", "SMALL", "RESERVED");
        assert!(s.matches_filters(Some(""), None, None));
    }

    #[test]
    fn domain_validators() {
        assert!(Stall::is_valid_size("LARGE"));
        assert!(!Stall::is_valid_size("HUGE"));
        assert!(Stall::is_valid_status("MAINTENANCE"));
        assert!(!Stall::is_valid_status("SOLD"));
    }
}
