use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::{
    controllers::{created, db_error, fail, ok, validation_error, ApiResult},
    middleware::{issue_token, AuthUser},
    models::User,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(get_profile))
        .route("/users/profile", put(update_profile))
        .route("/users/{id}", get(get_user))
}

/* ---------- helpers ---------- */

// Loose phone shape: digits with optional +, spaces and dashes
fn validate_contact_number(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    let charset_ok = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'));

    if !charset_ok || !(7..=15).contains(&digits) {
        return Err(ValidationError::new("contact_number")
            .with_message("contact number must be 7-15 digits".into()));
    }
    Ok(())
}

/* ---------- USERS ---------- */

// POST /api/users/register
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "username must be 3-32 characters"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[serde(rename = "businessName")]
    pub business_name: Option<String>,
    #[serde(rename = "contactNumber")]
    #[validate(custom(function = validate_contact_number))]
    pub contact_number: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<User> {
    req.validate().map_err(|e| validation_error(&e))?;

    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)",
    )
    .bind(&req.email)
    .bind(&req.username)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| db_error("register", e))?;

    if taken {
        return Err(fail(StatusCode::CONFLICT, "Email or username already registered"));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password"))?;

    // Self-service registration always creates vendors; employees are provisioned directly
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, role, business_name, contact_number)
        VALUES ($1, $2, $3, 'VENDOR', $4, $5)
        RETURNING *
        "#,
    )
    .bind(&req.username)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.business_name)
    .bind(&req.contact_number)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| db_error("register", e))?;

    tracing::info!("Registered vendor {} ({})", user.username, user.email);
    Ok(created("Registration successful", user))
}

// POST /api/users/login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    req.validate().map_err(|e| validation_error(&e))?;

    let user = User::find_by_email(&req.email, &state.db)
        .await
        .map_err(|e| db_error("login", e))?
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    if !user.verify_password(&req.password) {
        return Err(fail(StatusCode::UNAUTHORIZED, "Invalid email or password"));
    }

    let token = issue_token(user.user_id, &user.email, &user.role, &state.config.jwt)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to issue token"))?;

    sqlx::query("UPDATE users SET last_logged_in = NOW() WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&state.db.pool)
        .await
        .ok();

    Ok(ok("Login successful", LoginResponse { token, user }))
}

// GET /api/users/profile
async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<User> {
    let profile = User::find_by_id(user.user_id, &state.db)
        .await
        .map_err(|e| db_error("get_profile", e))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))?;

    Ok(ok("Profile", profile))
}

// PUT /api/users/profile
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 32, message = "username must be 3-32 characters"))]
    pub username: Option<String>,
    #[serde(rename = "businessName")]
    pub business_name: Option<String>,
    #[serde(rename = "contactNumber")]
    #[validate(custom(function = validate_contact_number))]
    pub contact_number: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    req.validate().map_err(|e| validation_error(&e))?;

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET username = COALESCE($2, username),
            business_name = COALESCE($3, business_name),
            contact_number = COALESCE($4, contact_number)
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(&req.username)
    .bind(&req.business_name)
    .bind(&req.contact_number)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| db_error("update_profile", e))?;

    Ok(ok("Profile updated", updated))
}

// GET /api/users/{id} - self or employee
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    user: AuthUser,
) -> ApiResult<serde_json::Value> {
    if user.user_id != id && !user.is_employee() {
        return Err(fail(StatusCode::FORBIDDEN, "Not allowed"));
    }

    let found = User::find_by_id(id, &state.db)
        .await
        .map_err(|e| db_error("get_user", e))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))?;

    Ok(ok("User", json!(found)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_number_shapes() {
        assert!(validate_contact_number("+94 71-234-5678").is_ok());
        assert!(validate_contact_number("0712345678").is_ok());
        assert!(validate_contact_number("12345").is_err()); // too short
        assert!(validate_contact_number("071 CALL ME").is_err()); // letters
    }

    #[test]
    fn register_request_validation() {
        let good = RegisterRequest {
            username: "vendor1".to_string(),
            email: "vendor@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
            business_name: Some("Good Reads".to_string()),
            contact_number: Some("0712345678".to_string()),
        };
        assert!(good.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..good
        };
        assert!(bad_email.validate().is_err());
    }
}
