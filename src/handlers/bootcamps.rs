use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::Value;
use sqlx::Row;

use super::{data_body, list_body, parse_id};
use crate::error::ApiError;
use crate::database::Repository;
use crate::geo::EARTH_RADIUS_MILES;
use crate::middleware::AuthUser;
use crate::models::bootcamp::{Bootcamp, CreateBootcamp, UpdateBootcamp};
use crate::models::user::Role;
use crate::query::{ListParams, ListQuery, Pagination};
use crate::state::AppState;

fn repo(state: &AppState) -> Repository<Bootcamp> {
    Repository::new("bootcamps", state.db.pool().clone())
}

/// GET /api/v1/bootcamps - filtered, sorted, paged listing
pub async fn list(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let params = ListParams::from_pairs(&raw)?;
    let query = ListQuery::new("bootcamps", params)?;
    let (items, count) = repo(&state).list(&query).await?;
    let pagination = Pagination::compute(query.page(), query.limit(), count);
    Ok(list_body(items, count, Some(pagination)))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let bootcamp = repo(&state).find_by_id_404(id).await?;
    Ok(data_body(bootcamp))
}

/// POST /api/v1/bootcamps (publisher/admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(mut payload): Json<CreateBootcamp>,
) -> Result<impl IntoResponse, ApiError> {
    user.authorize(&[Role::Publisher, Role::Admin])?;

    if payload.name.trim().is_empty() || payload.description.trim().is_empty() {
        return Err(ApiError::bad_request("Please add a name and description"));
    }

    resolve_location(&state, &mut payload.latitude, &mut payload.longitude, payload.address.as_deref())
        .await?;

    let bootcamp = Bootcamp::insert(state.db.pool(), user.id, &payload).await?;
    Ok((StatusCode::CREATED, data_body(bootcamp)))
}

/// PUT /api/v1/bootcamps/:id (owner/admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(mut payload): Json<UpdateBootcamp>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let existing = repo(&state).find_by_id_404(id).await?;
    if !user.can_modify(existing.user_id) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to update bootcamp {}",
            user.id, id
        )));
    }

    // A new address without explicit coordinates re-geocodes the point
    if payload.address.is_some() && payload.latitude.is_none() && payload.longitude.is_none() {
        resolve_location(&state, &mut payload.latitude, &mut payload.longitude, payload.address.as_deref())
            .await?;
    }

    let bootcamp = Bootcamp::update(state.db.pool(), id, &payload).await?;
    Ok(data_body(bootcamp))
}

/// DELETE /api/v1/bootcamps/:id (owner/admin)
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let existing = repo(&state).find_by_id_404(id).await?;
    if !user.can_modify(existing.user_id) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to delete bootcamp {}",
            user.id, id
        )));
    }

    repo(&state).delete_by_id(id).await?;
    Ok(data_body(serde_json::json!({})))
}

/// GET /api/v1/bootcamps/radius/:lat/:lng/:distance - bootcamps within
/// `distance` miles of the point
pub async fn radius(
    State(state): State<AppState>,
    Path((lat, lng, distance)): Path<(f64, f64, f64)>,
) -> Result<impl IntoResponse, ApiError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) || distance < 0.0 {
        return Err(ApiError::bad_request("Invalid latitude, longitude, or distance"));
    }

    // Great-circle distance evaluated in SQL; LEAST guards acos from
    // rounding drift above 1.0
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM bootcamps \
         WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
         AND {radius} * acos(LEAST(1.0, \
             cos(radians($1)) * cos(radians(latitude)) * cos(radians(longitude) - radians($2)) \
             + sin(radians($1)) * sin(radians(latitude)))) <= $3 \
         ORDER BY created_at DESC, id ASC) t",
        radius = EARTH_RADIUS_MILES,
    );

    let rows = sqlx::query(&sql)
        .bind(lat)
        .bind(lng)
        .bind(distance)
        .fetch_all(state.db.pool())
        .await
        .map_err(crate::database::DbError::from)?;
    let items: Vec<Value> = rows
        .iter()
        .map(|row| row.try_get::<Value, _>("row").unwrap_or(Value::Null))
        .collect();

    let count = items.len() as i64;
    Ok(list_body(items, count, None))
}

async fn resolve_location(
    state: &AppState,
    latitude: &mut Option<f64>,
    longitude: &mut Option<f64>,
    address: Option<&str>,
) -> Result<(), ApiError> {
    if latitude.is_some() && longitude.is_some() {
        return Ok(());
    }
    let Some(address) = address else { return Ok(()) };

    let (lat, lng) = state
        .geocoder
        .forward(address)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;
    *latitude = Some(lat);
    *longitude = Some(lng);
    Ok(())
}
