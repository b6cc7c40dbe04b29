use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use super::{data_body, list_body, parse_id};
use crate::auth::hash_password;
use crate::error::ApiError;
use crate::database::Repository;
use crate::middleware::AuthUser;
use crate::models::user::{CreateUser, Role, UpdateUser, User};
use crate::query::{ListParams, ListQuery, Pagination};
use crate::state::AppState;

/// Columns safe to expose through the dynamic listing; credentials and
/// reset-token state never leave the server.
const PUBLIC_COLUMNS: &[&str] = &["id", "name", "email", "role", "created_at"];

fn repo(state: &AppState) -> Repository<User> {
    Repository::new("users", state.db.pool().clone())
}

fn restrict_projection(params: &mut ListParams) {
    params.select = Some(match params.select.take() {
        Some(requested) => {
            let filtered: Vec<String> = requested
                .into_iter()
                .filter(|c| PUBLIC_COLUMNS.contains(&c.as_str()))
                .collect();
            if filtered.is_empty() {
                PUBLIC_COLUMNS.iter().map(|c| c.to_string()).collect()
            } else {
                filtered
            }
        }
        None => PUBLIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
    });
}

/// GET /api/v1/users (admin)
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    user.authorize(&[Role::Admin])?;

    let mut params = ListParams::from_pairs(&raw)?;
    restrict_projection(&mut params);
    let query = ListQuery::new("users", params)?;
    let (items, count) = repo(&state).list(&query).await?;
    let pagination = Pagination::compute(query.page(), query.limit(), count);
    Ok(list_body(items, count, Some(pagination)))
}

/// GET /api/v1/users/:id (admin)
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    user.authorize(&[Role::Admin])?;
    let id = parse_id(&id)?;
    let found = repo(&state).find_by_id_404(id).await?;
    Ok(data_body(found))
}

/// POST /api/v1/users (admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateUser>,
) -> Result<impl IntoResponse, ApiError> {
    user.authorize(&[Role::Admin])?;
    super::auth::validate_credentials(&payload)?;

    let password_hash = hash_password(&payload.password)?;
    let role = payload.role.unwrap_or(Role::User);
    let created = User::insert(state.db.pool(), &payload, &password_hash, role).await?;
    Ok((StatusCode::CREATED, data_body(created)))
}

/// PUT /api/v1/users/:id (admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUser>,
) -> Result<impl IntoResponse, ApiError> {
    user.authorize(&[Role::Admin])?;
    let id = parse_id(&id)?;
    let updated = User::update(state.db.pool(), id, &payload).await?;
    Ok(data_body(updated))
}

/// DELETE /api/v1/users/:id (admin)
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    user.authorize(&[Role::Admin])?;
    let id = parse_id(&id)?;
    if !repo(&state).delete_by_id(id).await? {
        return Err(ApiError::not_found(format!("Resource not found with id {}", id)));
    }
    Ok(data_body(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_never_exposes_credentials() {
        let mut params = ListParams::default();
        params.select = Some(vec!["name".to_string(), "password_hash".to_string()]);
        restrict_projection(&mut params);
        assert_eq!(params.select.as_deref(), Some(&["name".to_string()][..]));

        let mut params = ListParams::default();
        restrict_projection(&mut params);
        let cols = params.select.unwrap();
        assert!(!cols.contains(&"password_hash".to_string()));
        assert!(cols.contains(&"email".to_string()));
    }
}
