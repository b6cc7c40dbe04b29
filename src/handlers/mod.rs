pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::query::Pagination;

/// `{ success, count, pagination?, data }` list envelope.
pub fn list_body(items: Vec<Value>, count: i64, pagination: Option<Pagination>) -> Json<Value> {
    let mut body = json!({
        "success": true,
        "count": count,
        "data": items,
    });
    if let Some(pagination) = pagination {
        body["pagination"] = json!(pagination);
    }
    Json(body)
}

/// `{ success, data }` single-resource envelope.
pub fn data_body<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
    }))
}

/// Parse a path id, reporting malformed values inside the error envelope
/// rather than through the extractor's plain-text rejection.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id format: {}", raw)))
}
