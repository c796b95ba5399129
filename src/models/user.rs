use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub business_name: Option<String>,
    pub contact_number: Option<String>,
    pub registered_at: NaiveDateTime,
    pub is_active: bool,
    pub last_logged_in: NaiveDateTime,
}

impl User {
    pub fn is_valid_role(role: &str) -> bool {
        matches!(role, "VENDOR" | "EMPLOYEE")
    }

    pub fn is_employee(&self) -> bool {
        self.role == "EMPLOYEE"
    }

    // Find an active user by email
    pub async fn find_by_email(
        email: &str,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND is_active = true",
        )
        .bind(email)
        .fetch_optional(&db.pool)
        .await
    }

    pub async fn find_by_id(
        user_id: i32,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&db.pool)
            .await
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_domain() {
        assert!(User::is_valid_role("VENDOR"));
        assert!(User::is_valid_role("EMPLOYEE"));
        assert!(!User::is_valid_role("ADMIN"));
    }
}
