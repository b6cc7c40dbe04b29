use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::models::user::Role;

/// Authenticated user context extracted from the JWT
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub, role: claims.role }
    }
}

impl AuthUser {
    /// Role gate for restricted routes.
    pub fn authorize(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "User role {:?} is not authorized to access this route",
                self.role
            )))
        }
    }

    /// Owners can modify their own records; admins can modify anything.
    pub fn can_modify(&self, owner: Uuid) -> bool {
        self.id == owner || self.role == Role::Admin
    }
}

/// JWT authentication middleware that validates tokens and injects the
/// requesting user into request extensions.
pub async fn require_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token).map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Extract the token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Not authorized to access this route".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction_requires_prefix_and_content() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Token abc".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn ownership_allows_owner_and_admin_only() {
        let owner = Uuid::new_v4();
        let publisher = AuthUser { id: owner, role: Role::Publisher };
        let stranger = AuthUser { id: Uuid::new_v4(), role: Role::Publisher };
        let admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin };

        assert!(publisher.can_modify(owner));
        assert!(!stranger.can_modify(owner));
        assert!(admin.can_modify(owner));
    }

    #[test]
    fn role_gate_rejects_plain_users() {
        let user = AuthUser { id: Uuid::new_v4(), role: Role::User };
        assert!(user.authorize(&[Role::Publisher, Role::Admin]).is_err());
        assert!(user.authorize(&[Role::User]).is_ok());
    }
}
