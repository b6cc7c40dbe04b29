use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use super::{data_body, list_body, parse_id};
use crate::error::ApiError;
use crate::database::Repository;
use crate::middleware::AuthUser;
use crate::models::bootcamp::Bootcamp;
use crate::models::course::{Course, CreateCourse, UpdateCourse};
use crate::query::{Condition, Embed, ListParams, ListQuery, Pagination};
use crate::state::AppState;

fn repo(state: &AppState) -> Repository<Course> {
    Repository::new("courses", state.db.pool().clone())
}

fn bootcamp_embed() -> Embed {
    Embed::new("bootcamps", "bootcamp_id", &["id", "name", "description"], "bootcamp")
}

/// GET /api/v1/courses - filtered listing with the parent bootcamp embedded
pub async fn list(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let params = ListParams::from_pairs(&raw)?;
    let query = ListQuery::new("courses", params)?.embed(bootcamp_embed())?;
    let (items, count) = repo(&state).list(&query).await?;
    let pagination = Pagination::compute(query.page(), query.limit(), count);
    Ok(list_body(items, count, Some(pagination)))
}

/// GET /api/v1/bootcamps/:id/courses - all courses of one bootcamp
pub async fn list_by_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    let params = ListParams::default()
        .scoped(Condition::eq("bootcamp_id", serde_json::json!(bootcamp_id.to_string())));
    let query = ListQuery::new("courses", params)?.unpaginated();
    let (items, count) = repo(&state).list(&query).await?;
    Ok(list_body(items, count, None))
}

/// GET /api/v1/courses/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let params = ListParams::default().scoped(Condition::eq("id", serde_json::json!(id.to_string())));
    let query = ListQuery::new("courses", params)?.embed(bootcamp_embed())?.unpaginated();
    let (items, _) = repo(&state).list(&query).await?;
    let course = items
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("No course with the id of {}", id)))?;
    Ok(data_body(course))
}

/// POST /api/v1/bootcamps/:id/courses (bootcamp owner/admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(bootcamp_id): Path<String>,
    Json(payload): Json<CreateCourse>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id)?;

    let bootcamp = Repository::<Bootcamp>::new("bootcamps", state.db.pool().clone())
        .find_by_id(bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", bootcamp_id)))?;

    if !user.can_modify(bootcamp.user_id) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to add a course to bootcamp {}",
            user.id, bootcamp_id
        )));
    }
    if payload.tuition < 0.0 {
        return Err(ApiError::bad_request("Tuition cannot be negative"));
    }

    let course = Course::insert(state.db.pool(), bootcamp_id, user.id, &payload).await?;
    state.stats.recalculate_cost(bootcamp_id).await;
    Ok((StatusCode::CREATED, data_body(course)))
}

/// PUT /api/v1/courses/:id (course owner/admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCourse>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let existing = repo(&state).find_by_id_404(id).await?;
    if !user.can_modify(existing.user_id) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to update course {}",
            user.id, id
        )));
    }
    if payload.tuition.is_some_and(|t| t < 0.0) {
        return Err(ApiError::bad_request("Tuition cannot be negative"));
    }

    let course = Course::update(state.db.pool(), id, &payload).await?;
    // Tuition may have changed
    state.stats.recalculate_cost(course.bootcamp_id).await;
    Ok(data_body(course))
}

/// DELETE /api/v1/courses/:id (course owner/admin)
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let existing = repo(&state).find_by_id_404(id).await?;
    if !user.can_modify(existing.user_id) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to delete course {}",
            user.id, id
        )));
    }

    repo(&state).delete_by_id(id).await?;
    state.stats.recalculate_cost(existing.bootcamp_id).await;
    Ok(data_body(serde_json::json!({})))
}
