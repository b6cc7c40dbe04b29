use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use bootcamp_api::database::Db;
use bootcamp_api::routes;
use bootcamp_api::state::AppState;

/// Router backed by a lazily-connecting pool. Routes that never reach the
/// store (envelope shapes, auth rejection, input validation) work without a
/// running database.
pub fn offline_app() -> Router {
    let db = Db::connect_lazy("postgres://postgres@127.0.0.1:1/offline").expect("lazy pool");
    routes::app(AppState::new(db))
}

pub struct LiveCtx {
    pub app: Router,
    pub db: Db,
}

/// Live harness gated on TEST_DATABASE_URL: tests skip cleanly when the
/// environment provides no database.
pub async fn live_ctx() -> Result<Option<LiveCtx>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping live API test");
        return Ok(None);
    };
    let db = Db::connect_lazy(&url)?;
    db.migrate().await?;
    let app = routes::app(AppState::new(db.clone()));
    Ok(Some(LiveCtx { app, db }))
}

/// Drive one request through the router and decode the JSON body (Null for
/// empty bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, payload))
}
