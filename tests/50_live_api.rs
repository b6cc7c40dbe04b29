mod common;

use anyhow::Result;
use axum::http::StatusCode;
use axum::Router;
use serde_json::{json, Value};
use uuid::Uuid;

// Full-stack tests against a real Postgres, gated on TEST_DATABASE_URL.
// Each test creates its own users and bootcamps (unique names/emails) so the
// suite is safe to run in parallel against a shared database.

async fn register(app: &Router, role: &str) -> Result<String> {
    let email = format!("{}@test.dev", Uuid::new_v4());
    let (status, body) = common::send(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"name": "Test User", "email": email, "password": "123456", "role": role})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    Ok(body["token"].as_str().expect("token").to_string())
}

async fn create_bootcamp(app: &Router, token: &str) -> Result<String> {
    let name = format!("Testcamp {}", Uuid::new_v4());
    let (status, body) = common::send(
        app,
        "POST",
        "/api/v1/bootcamps",
        Some(token),
        Some(json!({
            "name": name,
            "description": "A bootcamp for tests",
            "latitude": 42.35,
            "longitude": -71.06,
            "careers": ["Web Development"]
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "create bootcamp failed: {}", body);
    Ok(body["data"]["id"].as_str().expect("bootcamp id").to_string())
}

async fn add_course(app: &Router, token: &str, bootcamp_id: &str, title: &str, tuition: f64) -> Result<String> {
    let (status, body) = common::send(
        app,
        "POST",
        &format!("/api/v1/bootcamps/{}/courses", bootcamp_id),
        Some(token),
        Some(json!({
            "title": title,
            "description": "course for tests",
            "weeks": "8",
            "tuition": tuition,
            "minimum_skill": "beginner"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "add course failed: {}", body);
    Ok(body["data"]["id"].as_str().expect("course id").to_string())
}

async fn get_bootcamp(app: &Router, id: &str) -> Result<Value> {
    let (status, body) = common::send(app, "GET", &format!("/api/v1/bootcamps/{}", id), None, None).await?;
    assert_eq!(status, StatusCode::OK, "get bootcamp failed: {}", body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn register_login_me_round_trip() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let email = format!("{}@test.dev", Uuid::new_v4());
    let (status, body) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"name": "Jane", "email": email, "password": "123456", "role": "publisher"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    let token = body["token"].as_str().expect("token").to_string();

    let (status, body) = common::send(&ctx.app, "GET", "/api/v1/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], json!(email));
    assert!(body["data"]["password_hash"].is_null(), "hash leaked: {}", body);

    let (status, body) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "123456"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "wrong-pass"})),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn password_reset_flow_rotates_credentials() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let email = format!("{}@test.dev", Uuid::new_v4());
    let (status, _) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"name": "Amnesiac", "email": email, "password": "123456"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/forgotpassword",
        None,
        Some(json!({"email": email})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let reset_token = body["data"].as_str().expect("reset token").to_string();

    // A wrong token is rejected
    let (status, _) = common::send(
        &ctx.app,
        "PUT",
        "/api/v1/auth/resetpassword/deadbeef",
        None,
        Some(json!({"password": "654321"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = common::send(
        &ctx.app,
        "PUT",
        &format!("/api/v1/auth/resetpassword/{}", reset_token),
        None,
        Some(json!({"password": "654321"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    // Old password no longer works, new one does; the token is single-use
    let (status, _) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "123456"})),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "654321"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::send(
        &ctx.app,
        "PUT",
        &format!("/api/v1/auth/resetpassword/{}", reset_token),
        None,
        Some(json!({"password": "another1"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn bootcamp_crud_enforces_roles_and_ownership() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let owner = register(&ctx.app, "publisher").await?;
    let plain_user = register(&ctx.app, "user").await?;
    let other_publisher = register(&ctx.app, "publisher").await?;

    // Plain users cannot create bootcamps
    let (status, _) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/bootcamps",
        Some(&plain_user),
        Some(json!({"name": format!("Nope {}", Uuid::new_v4()), "description": "x"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = create_bootcamp(&ctx.app, &owner).await?;

    // Slug tracks the name on update, derived fields start unset
    let bootcamp = get_bootcamp(&ctx.app, &id).await?;
    assert!(bootcamp["slug"].as_str().unwrap_or_default().starts_with("testcamp-"));
    assert!(bootcamp["average_cost"].is_null());

    let (status, body) = common::send(
        &ctx.app,
        "PUT",
        &format!("/api/v1/bootcamps/{}", id),
        Some(&owner),
        Some(json!({"name": format!("Renamed Camp {}", Uuid::new_v4())})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["slug"].as_str().unwrap_or_default().starts_with("renamed-camp-"));

    // Only the owner (or an admin) may modify
    let (status, _) = common::send(
        &ctx.app,
        "PUT",
        &format!("/api/v1/bootcamps/{}", id),
        Some(&other_publisher),
        Some(json!({"description": "hijacked"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        common::send(&ctx.app, "DELETE", &format!("/api/v1/bootcamps/{}", id), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::send(&ctx.app, "GET", &format!("/api/v1/bootcamps/{}", id), None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn average_cost_follows_course_mutations() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let owner = register(&ctx.app, "publisher").await?;
    let id = create_bootcamp(&ctx.app, &owner).await?;

    // First course: mean 100 rounds to 100
    let course_a = add_course(&ctx.app, &owner, &id, "Course A", 100.0).await?;
    assert_eq!(get_bootcamp(&ctx.app, &id).await?["average_cost"], json!(100));

    // Second course: mean 107.5 rounds up to 110
    let course_b = add_course(&ctx.app, &owner, &id, "Course B", 115.0).await?;
    assert_eq!(get_bootcamp(&ctx.app, &id).await?["average_cost"], json!(110));

    // Updating tuition recomputes: mean(185, 115) = 150
    let (status, _) = common::send(
        &ctx.app,
        "PUT",
        &format!("/api/v1/courses/{}", course_a),
        Some(&owner),
        Some(json!({"tuition": 185.0})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(get_bootcamp(&ctx.app, &id).await?["average_cost"], json!(150));

    // Removing children recomputes over the remaining set; the empty group
    // goes back to a defined null
    for course in [&course_a, &course_b] {
        let (status, _) =
            common::send(&ctx.app, "DELETE", &format!("/api/v1/courses/{}", course), Some(&owner), None)
                .await?;
        assert_eq!(status, StatusCode::OK);
    }
    assert!(get_bootcamp(&ctx.app, &id).await?["average_cost"].is_null());
    Ok(())
}

#[tokio::test]
async fn average_rating_is_raw_and_reviews_are_unique_per_user() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let owner = register(&ctx.app, "publisher").await?;
    let reviewer = register(&ctx.app, "user").await?;
    let id = create_bootcamp(&ctx.app, &owner).await?;

    let (status, body) = common::send(
        &ctx.app,
        "POST",
        &format!("/api/v1/bootcamps/{}/reviews", id),
        Some(&reviewer),
        Some(json!({"title": "Great", "body": "Learned a lot", "rating": 8})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    let review_id = body["data"]["id"].as_str().expect("review id").to_string();
    assert_eq!(get_bootcamp(&ctx.app, &id).await?["average_rating"], json!(8.0));

    // Second review from the same user violates the unique pair
    let (status, _) = common::send(
        &ctx.app,
        "POST",
        &format!("/api/v1/bootcamps/{}/reviews", id),
        Some(&reviewer),
        Some(json!({"title": "Again", "body": "Twice", "rating": 9})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Out-of-range rating is rejected up front
    let (status, _) = common::send(
        &ctx.app,
        "POST",
        &format!("/api/v1/bootcamps/{}/reviews", id),
        Some(&owner),
        Some(json!({"title": "Bad", "body": "x", "rating": 11})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Removing the last review leaves a defined value, not a crash
    let (status, _) =
        common::send(&ctx.app, "DELETE", &format!("/api/v1/reviews/{}", review_id), Some(&reviewer), None)
            .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(get_bootcamp(&ctx.app, &id).await?["average_rating"].is_null());
    Ok(())
}

#[tokio::test]
async fn pagination_walk_reproduces_the_filtered_set_exactly() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let owner = register(&ctx.app, "publisher").await?;
    let id = create_bootcamp(&ctx.app, &owner).await?;

    let mut created: Vec<String> = vec![];
    for i in 0..5 {
        created.push(add_course(&ctx.app, &owner, &id, &format!("Course {}", i), 1000.0 * (i + 1) as f64).await?);
    }
    created.sort();

    let mut walked: Vec<String> = vec![];
    let mut page = 1;
    loop {
        let (status, body) = common::send(
            &ctx.app,
            "GET",
            &format!("/api/v1/courses?bootcamp_id={}&limit=2&page={}&sort=title", id, page),
            None,
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK, "body: {}", body);
        assert_eq!(body["count"], json!(5));

        let items = body["data"].as_array().expect("data array");
        assert!(items.len() <= 2, "page over limit: {}", body);
        for item in items {
            walked.push(item["id"].as_str().expect("id").to_string());
        }

        // prev present iff past the first page, next present iff more remain
        assert_eq!(body["pagination"]["prev"].is_object(), page > 1, "body: {}", body);
        if body["pagination"]["next"].is_object() {
            page += 1;
        } else {
            break;
        }
    }

    assert_eq!(walked.len(), 5, "pages overlapped or skipped");
    let mut walked_sorted = walked.clone();
    walked_sorted.sort();
    walked_sorted.dedup();
    assert_eq!(walked_sorted, created, "walk did not reproduce the set");
    Ok(())
}

#[tokio::test]
async fn filter_operators_and_projection_shape_the_listing() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let owner = register(&ctx.app, "publisher").await?;
    let id = create_bootcamp(&ctx.app, &owner).await?;
    add_course(&ctx.app, &owner, &id, "Cheap", 500.0).await?;
    add_course(&ctx.app, &owner, &id, "Mid", 5000.0).await?;
    add_course(&ctx.app, &owner, &id, "Expensive", 9000.0).await?;

    // tuition[gt] filters strictly greater
    let (status, body) = common::send(
        &ctx.app,
        "GET",
        &format!("/api/v1/courses?bootcamp_id={}&tuition[gt]=5000", id),
        None,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1), "body: {}", body);
    assert_eq!(body["data"][0]["title"], json!("Expensive"));

    // [in] accepts a comma list
    let (_, body) = common::send(
        &ctx.app,
        "GET",
        &format!("/api/v1/courses?bootcamp_id={}&title[in]=Cheap,Mid", id),
        None,
        None,
    )
    .await?;
    assert_eq!(body["count"], json!(2), "body: {}", body);

    // select projects columns, sort orders descending
    let (_, body) = common::send(
        &ctx.app,
        "GET",
        &format!("/api/v1/courses?bootcamp_id={}&select=title,tuition&sort=-tuition", id),
        None,
        None,
    )
    .await?;
    let items = body["data"].as_array().expect("data array");
    assert_eq!(items[0]["title"], json!("Expensive"));
    assert!(items[0].get("weeks").is_none(), "projection leaked: {}", body);
    let tuitions: Vec<f64> = items.iter().map(|i| i["tuition"].as_f64().unwrap_or_default()).collect();
    assert!(tuitions.windows(2).all(|w| w[0] >= w[1]), "not descending: {:?}", tuitions);
    Ok(())
}

#[tokio::test]
async fn concurrent_course_creates_converge_on_the_full_mean() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let owner = register(&ctx.app, "publisher").await?;
    let id = create_bootcamp(&ctx.app, &owner).await?;

    let (a, b) = tokio::join!(
        add_course(&ctx.app, &owner, &id, "Concurrent A", 100.0),
        add_course(&ctx.app, &owner, &id, "Concurrent B", 115.0),
    );
    a?;
    b?;

    // Per-parent serialization: whichever recompute ran last saw both rows,
    // so the stored aggregate reflects both tuitions
    assert_eq!(get_bootcamp(&ctx.app, &id).await?["average_cost"], json!(110));
    Ok(())
}

#[tokio::test]
async fn nested_listings_scope_to_the_parent() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    let owner = register(&ctx.app, "publisher").await?;
    let camp_a = create_bootcamp(&ctx.app, &owner).await?;
    let camp_b = create_bootcamp(&ctx.app, &owner).await?;
    add_course(&ctx.app, &owner, &camp_a, "A only", 1000.0).await?;

    let (status, body) =
        common::send(&ctx.app, "GET", &format!("/api/v1/bootcamps/{}/courses", camp_a), None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));

    let (_, body) =
        common::send(&ctx.app, "GET", &format!("/api/v1/bootcamps/{}/courses", camp_b), None, None).await?;
    assert_eq!(body["count"], json!(0));

    // Single course reads embed the parent summary
    let (_, body) = common::send(&ctx.app, "GET", &format!("/api/v1/courses?bootcamp_id={}", camp_a), None, None)
        .await?;
    let course_id = body["data"][0]["id"].as_str().expect("id").to_string();
    let (status, body) =
        common::send(&ctx.app, "GET", &format!("/api/v1/courses/{}", course_id), None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["bootcamp"]["name"].is_string(), "embed missing: {}", body);
    Ok(())
}

#[tokio::test]
async fn users_endpoints_are_admin_only_and_never_leak_credentials() -> Result<()> {
    let Some(ctx) = common::live_ctx().await? else { return Ok(()) };

    // Admins cannot self-register; create one directly and log in
    let email = format!("{}@test.dev", Uuid::new_v4());
    let password_hash = bootcamp_api::auth::hash_password("123456").expect("hash");
    let payload = bootcamp_api::models::user::CreateUser {
        name: "Root".to_string(),
        email: email.clone(),
        password: "123456".to_string(),
        role: None,
    };
    bootcamp_api::models::user::User::insert(
        ctx.db.pool(),
        &payload,
        &password_hash,
        bootcamp_api::models::user::Role::Admin,
    )
    .await?;

    let (status, body) = common::send(
        &ctx.app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "123456"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let admin = body["token"].as_str().expect("token").to_string();

    let non_admin = register(&ctx.app, "publisher").await?;
    let (status, _) = common::send(&ctx.app, "GET", "/api/v1/users", Some(&non_admin), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = common::send(
        &ctx.app,
        "GET",
        &format!("/api/v1/users?email={}", email),
        Some(&admin),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1), "body: {}", body);
    assert!(body["data"][0].get("password_hash").is_none(), "hash leaked: {}", body);

    // Asking for a credential column falls back to the safe projection
    let (_, body) = common::send(
        &ctx.app,
        "GET",
        &format!("/api/v1/users?email={}&select=password_hash", email),
        Some(&admin),
        None,
    )
    .await?;
    assert!(body["data"][0].get("password_hash").is_none(), "hash leaked: {}", body);
    Ok(())
}
