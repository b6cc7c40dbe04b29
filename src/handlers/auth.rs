use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use super::data_body;
use crate::auth::{
    generate_jwt, generate_reset_token, hash_password, hash_reset_token, verify_password, Claims,
};
use crate::error::ApiError;
use crate::database::Repository;
use crate::middleware::AuthUser;
use crate::models::user::{CreateUser, Role, User};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&payload)?;

    // Self-registration may pick user or publisher; admin accounts are
    // created by admins only
    let role = match payload.role {
        Some(Role::Admin) => return Err(ApiError::bad_request("Cannot self-register as admin")),
        Some(role) => role,
        None => Role::User,
    };

    let password_hash = hash_password(&payload.password)?;
    let user = User::insert(state.db.pool(), &payload, &password_hash, role).await?;
    let token = generate_jwt(&Claims::new(&user))?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "token": token }))))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Please provide an email and password"));
    }

    let user = User::find_by_email(state.db.pool(), &payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = generate_jwt(&Claims::new(&user))?;
    Ok(Json(json!({ "success": true, "token": token })))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = Repository::<User>::new("users", state.db.pool().clone())
        .find_by_id_404(auth.id)
        .await?;
    Ok(data_body(user))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// POST /api/v1/auth/forgotpassword
///
/// Stores a hashed, expiring reset token for the account and returns the
/// plaintext token to the caller; delivering it out of band is a deployment
/// concern, not this service's.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_email(state.db.pool(), &payload.email)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;

    let reset = generate_reset_token();
    User::set_reset_token(state.db.pool(), user.id, &reset.token_hash, reset.expires).await?;

    Ok(Json(json!({ "success": true, "data": reset.token })))
}

/// PUT /api/v1/auth/resetpassword/:resettoken
pub async fn reset_password(
    State(state): State<AppState>,
    Path(resettoken): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.password.len() < 6 {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }

    let token_hash = hash_reset_token(&resettoken);
    let user = User::find_by_reset_token(state.db.pool(), &token_hash)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired token"))?;

    let password_hash = hash_password(&payload.password)?;
    User::set_password(state.db.pool(), user.id, &password_hash).await?;

    let token = generate_jwt(&Claims::new(&user))?;
    Ok(Json(json!({ "success": true, "token": token })))
}

pub(super) fn validate_credentials(payload: &CreateUser) -> Result<(), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Please add your name"));
    }
    if !is_plausible_email(&payload.email) {
        return Err(ApiError::bad_request("Please add a valid email"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else { return false };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, email: &str, password: &str) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: None,
        }
    }

    #[test]
    fn registration_payloads_are_validated() {
        assert!(validate_credentials(&payload("John", "john@example.com", "123456")).is_ok());
        assert!(validate_credentials(&payload("", "john@example.com", "123456")).is_err());
        assert!(validate_credentials(&payload("John", "not-an-email", "123456")).is_err());
        assert!(validate_credentials(&payload("John", "john@example.com", "12345")).is_err());
    }

    #[test]
    fn email_plausibility_requires_local_and_dotted_domain() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@bco"));
        assert!(!is_plausible_email("a@.co"));
        assert!(!is_plausible_email("a@b.co."));
    }
}
