use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{auth, bootcamps, courses, reviews, users};
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Listings and single-resource reads are public
        .route("/api/v1/bootcamps", get(bootcamps::list))
        .route("/api/v1/bootcamps/:id", get(bootcamps::get))
        .route("/api/v1/bootcamps/radius/:lat/:lng/:distance", get(bootcamps::radius))
        .route("/api/v1/bootcamps/:id/courses", get(courses::list_by_bootcamp))
        .route("/api/v1/bootcamps/:id/reviews", get(reviews::list_by_bootcamp))
        .route("/api/v1/courses", get(courses::list))
        .route("/api/v1/courses/:id", get(courses::get))
        .route("/api/v1/reviews", get(reviews::list))
        .route("/api/v1/reviews/:id", get(reviews::get))
        // Token acquisition and recovery
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/forgotpassword", post(auth::forgot_password))
        .route(
            "/api/v1/auth/resetpassword/:resettoken",
            axum::routing::put(auth::reset_password),
        )
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/bootcamps", post(bootcamps::create))
        .route(
            "/api/v1/bootcamps/:id",
            axum::routing::put(bootcamps::update).delete(bootcamps::remove),
        )
        .route("/api/v1/bootcamps/:id/courses", post(courses::create))
        .route("/api/v1/bootcamps/:id/reviews", post(reviews::create))
        .route(
            "/api/v1/courses/:id",
            axum::routing::put(courses::update).delete(courses::remove),
        )
        .route(
            "/api/v1/reviews/:id",
            axum::routing::put(reviews::update).delete(reviews::remove),
        )
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/users", get(users::list).post(users::create))
        .route(
            "/api/v1/users/:id",
            get(users::get).put(users::update).delete(users::remove),
        )
        .route_layer(axum_middleware::from_fn(require_auth))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Bootcamp Directory API",
            "version": version,
            "endpoints": {
                "bootcamps": "/api/v1/bootcamps[/:id] (list/read public, write protected)",
                "radius": "/api/v1/bootcamps/radius/:lat/:lng/:distance (public)",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses",
                "reviews": "/api/v1/reviews[/:id], /api/v1/bootcamps/:id/reviews",
                "users": "/api/v1/users[/:id] (admin)",
                "auth": "/api/v1/auth/register, /api/v1/auth/login, /api/v1/auth/me, /api/v1/auth/forgotpassword, /api/v1/auth/resetpassword/:resettoken",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.ping().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
