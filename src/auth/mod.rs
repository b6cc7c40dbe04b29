use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;
use crate::models::user::{Role, User};

#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    InvalidToken(String),
    MissingSecret,
    Hash(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            AuthError::MissingSecret => write!(f, "JWT secret not configured"),
            AuthError::Hash(msg) => write!(f, "Password hashing error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self {
            sub: user.id,
            role: user.role,
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Password-reset token pair: the plaintext goes to the user, only the
/// sha256 digest is stored.
#[derive(Debug)]
pub struct ResetToken {
    pub token: String,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
}

pub fn generate_reset_token() -> ResetToken {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let expires = Utc::now() + Duration::minutes(config::config().security.reset_token_expiry_mins);
    ResetToken { token_hash: hash_reset_token(&token), token, expires }
}

pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "John".to_string(),
            email: "john@example.com".to_string(),
            role: Role::Publisher,
            password_hash: String::new(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn jwt_round_trips_subject_and_role() {
        let user = sample_user();
        let token = generate_jwt(&Claims::new(&user)).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Publisher);
    }

    #[test]
    fn tampered_jwt_is_rejected() {
        let user = sample_user();
        let mut token = generate_jwt(&Claims::new(&user)).unwrap();
        token.push('x');
        assert!(validate_jwt(&token).is_err());
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("123456").unwrap();
        assert!(verify_password("123456", &hash).unwrap());
        assert!(!verify_password("654321", &hash).unwrap());
    }

    #[test]
    fn reset_token_stores_only_the_digest() {
        let reset = generate_reset_token();
        assert_eq!(reset.token.len(), 40);
        assert_ne!(reset.token, reset.token_hash);
        assert_eq!(hash_reset_token(&reset.token), reset.token_hash);
    }
}
