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
use crate::models::review::{CreateReview, Review, UpdateReview};
use crate::query::{Condition, Embed, ListParams, ListQuery, Pagination};
use crate::state::AppState;

fn repo(state: &AppState) -> Repository<Review> {
    Repository::new("reviews", state.db.pool().clone())
}

fn bootcamp_embed() -> Embed {
    Embed::new("bootcamps", "bootcamp_id", &["id", "name", "description"], "bootcamp")
}

/// GET /api/v1/reviews - filtered listing with the parent bootcamp embedded
pub async fn list(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let params = ListParams::from_pairs(&raw)?;
    let query = ListQuery::new("reviews", params)?.embed(bootcamp_embed())?;
    let (items, count) = repo(&state).list(&query).await?;
    let pagination = Pagination::compute(query.page(), query.limit(), count);
    Ok(list_body(items, count, Some(pagination)))
}

/// GET /api/v1/bootcamps/:id/reviews - all reviews of one bootcamp
pub async fn list_by_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    let params = ListParams::default()
        .scoped(Condition::eq("bootcamp_id", serde_json::json!(bootcamp_id.to_string())));
    let query = ListQuery::new("reviews", params)?.unpaginated();
    let (items, count) = repo(&state).list(&query).await?;
    Ok(list_body(items, count, None))
}

/// GET /api/v1/reviews/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let params = ListParams::default().scoped(Condition::eq("id", serde_json::json!(id.to_string())));
    let query = ListQuery::new("reviews", params)?.embed(bootcamp_embed())?.unpaginated();
    let (items, _) = repo(&state).list(&query).await?;
    let review = items
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("No review found with the id of {}", id)))?;
    Ok(data_body(review))
}

/// POST /api/v1/bootcamps/:id/reviews (authenticated; one per user per
/// bootcamp, enforced by the unique index)
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(bootcamp_id): Path<String>,
    Json(payload): Json<CreateReview>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    Review::validate_rating(payload.rating).map_err(ApiError::bad_request)?;

    Repository::<Bootcamp>::new("bootcamps", state.db.pool().clone())
        .find_by_id(bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", bootcamp_id)))?;

    let review = match Review::insert(state.db.pool(), bootcamp_id, user.id, &payload).await {
        Ok(review) => review,
        Err(err) => {
            let api_err: ApiError = err.into();
            if matches!(api_err, ApiError::Conflict(_)) {
                return Err(ApiError::conflict("You have already reviewed this bootcamp"));
            }
            return Err(api_err);
        }
    };
    state.stats.recalculate_rating(bootcamp_id).await;
    Ok((StatusCode::CREATED, data_body(review)))
}

/// PUT /api/v1/reviews/:id (review author/admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateReview>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    if let Some(rating) = payload.rating {
        Review::validate_rating(rating).map_err(ApiError::bad_request)?;
    }

    let existing = repo(&state).find_by_id_404(id).await?;
    if !user.can_modify(existing.user_id) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to update review {}",
            user.id, id
        )));
    }

    let review = Review::update(state.db.pool(), id, &payload).await?;
    state.stats.recalculate_rating(review.bootcamp_id).await;
    Ok(data_body(review))
}

/// DELETE /api/v1/reviews/:id (review author/admin)
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let existing = repo(&state).find_by_id_404(id).await?;
    if !user.can_modify(existing.user_id) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to delete review {}",
            user.id, id
        )));
    }

    repo(&state).delete_by_id(id).await?;
    // Removing the last review leaves the aggregate at its defined NULL
    state.stats.recalculate_rating(existing.bootcamp_id).await;
    Ok(data_body(serde_json::json!({})))
}
