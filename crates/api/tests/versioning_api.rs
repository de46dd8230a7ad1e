//! HTTP-level integration tests for versioned test cases and fixtures.
//!
//! Uses tower's `ServiceExt::oneshot` against the full router, without a
//! TCP listener.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use casebook_events::{EventBus, VersionCreated};
use common::{
    admin_token, body_json, creator_token, delete_auth, get, get_auth, post_auth, post_json_auth,
    post_raw_json_auth, put_json_auth, viewer_token, CREATOR_ID,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a test case and return its id.
async fn create_test_case(pool: &PgPool, name: &str) -> i64 {
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/test-cases",
        json!({ "name": name }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["parent"]["id"]
        .as_i64()
        .unwrap()
}

/// Add a step and return the new live version label.
async fn add_step(pool: &PgPool, kind: &str, id: i64, action: &str) -> String {
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/{kind}/{id}/steps"),
        json!({ "action": action }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["version"]["version"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn live_steps(pool: &PgPool, id: i64) -> Vec<serde_json::Value> {
    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, &format!("/api/v1/test-cases/{id}"), &viewer_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["steps"]
        .as_array()
        .unwrap()
        .clone()
}

async fn versions(pool: &PgPool, id: i64) -> Vec<serde_json::Value> {
    let app = common::build_test_app(pool.clone());
    let response = get_auth(
        app,
        &format!("/api/v1/test-cases/{id}/versions"),
        &viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Parent CRUD
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_returns_201_with_initial_version(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/test-cases",
        json!({ "name": "Login works", "description": "Happy path" }),
        &creator_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["parent"]["name"], "Login works");
    assert_eq!(json["data"]["parent"]["live_version"], "1.0.0");
    assert_eq!(json["data"]["parent"]["created_by"], CREATOR_ID);
    assert_eq!(json["data"]["version"]["version"], "1.0.0");
    assert_eq!(json["data"]["version"]["created_by"], CREATOR_ID);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_parent_includes_steps(pool: PgPool) {
    let id = create_test_case(&pool, "With steps").await;
    add_step(&pool, "test-cases", id, "open page").await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/test-cases/{id}"), &viewer_token()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "With steps");
    assert_eq!(json["data"]["live_version"], "1.0.1");
    assert_eq!(json["data"]["steps"][0]["action"], "open page");
    assert_eq!(json["data"]["steps"][0]["step_order"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_parents_paginates(pool: PgPool) {
    for name in ["one", "two", "three"] {
        create_test_case(&pool, name).await;
    }

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/test-cases?limit=2", &viewer_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_parent_creates_version(pool: PgPool) {
    let id = create_test_case(&pool, "Old name").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}"),
        json!({ "name": "New name" }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["parent"]["name"], "New name");
    assert_eq!(json["data"]["version"]["version"], "1.0.1");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_delete_parent_returns_204_then_404(pool: PgPool) {
    let id = create_test_case(&pool, "Doomed").await;

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/test-cases/{id}"), &creator_token()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/test-cases/{id}"), &viewer_token()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_blank_name_is_validation_error(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/test-cases",
        json!({ "name": "   " }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Steps and history
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_step_edits_walk_the_version_history(pool: PgPool) {
    let id = create_test_case(&pool, "Sign in").await;
    assert_eq!(add_step(&pool, "test-cases", id, "click login").await, "1.0.1");
    assert_eq!(
        add_step(&pool, "test-cases", id, "enter password").await,
        "1.0.2"
    );

    let first = live_steps(&pool, id).await[0]["id"].as_i64().unwrap();
    let app = common::build_test_app(pool.clone());
    let response = delete_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps/{first}"),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["version"]["version"],
        "1.0.3"
    );

    let live = live_steps(&pool, id).await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["action"], "enter password");
    assert_eq!(live[0]["step_order"], 0);

    // Newest first.
    let history = versions(&pool, id).await;
    let labels: Vec<&str> = history
        .iter()
        .map(|v| v["version"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["1.0.3", "1.0.2", "1.0.1", "1.0.0"]);

    // Revert to 1.0.1.
    let target = history[2]["id"].as_i64().unwrap();
    let app = common::build_test_app(pool.clone());
    let response = post_auth(
        app,
        &format!("/api/v1/test-cases/{id}/versions/{target}/revert"),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["version"]["version"], "1.0.4");
    assert_eq!(json["data"]["parent"]["live_version"], "1.0.4");

    let live = live_steps(&pool, id).await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["action"], "click login");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_version_and_its_steps(pool: PgPool) {
    let id = create_test_case(&pool, "Snapshots").await;
    add_step(&pool, "test-cases", id, "first").await;
    let version_id = versions(&pool, id).await[0]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = get_auth(
        app,
        &format!("/api/v1/test-cases/{id}/versions/{version_id}"),
        &viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["version"], "1.0.1");
    assert_eq!(json["data"]["steps"][0]["action"], "first");

    let app = common::build_test_app(pool);
    let response = get_auth(
        app,
        &format!("/api/v1/test-cases/{id}/versions/{version_id}/steps"),
        &viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_step_and_insert_at_position(pool: PgPool) {
    let id = create_test_case(&pool, "Edit").await;
    add_step(&pool, "test-cases", id, "a").await;
    add_step(&pool, "test-cases", id, "c").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps"),
        json!({ "action": "b", "position": 1, "expected": "b happens" }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let live = live_steps(&pool, id).await;
    let actions: Vec<&str> = live.iter().map(|s| s["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["a", "b", "c"]);

    let step_id = live[1]["id"].as_i64().unwrap();
    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps/{step_id}"),
        json!({ "expected": null, "disabled": true }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["version"]["version"],
        "1.0.4"
    );

    let live = live_steps(&pool, id).await;
    assert!(live[1]["expected"].is_null());
    assert_eq!(live[1]["disabled"], true);
    assert_eq!(live[1]["action"], "b");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_reorder_steps(pool: PgPool) {
    let id = create_test_case(&pool, "Reorder").await;
    for action in ["a", "b", "c"] {
        add_step(&pool, "test-cases", id, action).await;
    }
    let ids: Vec<i64> = live_steps(&pool, id)
        .await
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps/order"),
        json!({ "step_ids": [ids[2], ids[1], ids[0]] }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let actions: Vec<String> = live_steps(&pool, id)
        .await
        .iter()
        .map(|s| s["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["c", "b", "a"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_reorder_with_missing_id_returns_422(pool: PgPool) {
    let id = create_test_case(&pool, "Bad reorder").await;
    for action in ["a", "b"] {
        add_step(&pool, "test-cases", id, action).await;
    }
    let first = live_steps(&pool, id).await[0]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps/order"),
        json!({ "step_ids": [first] }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "INVALID_ORDER");

    assert_eq!(versions(&pool, id).await.len(), 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_step_body_of_wrong_shape_is_validation_error(pool: PgPool) {
    let id = create_test_case(&pool, "Wrong shape").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps"),
        json!({ "data": "x" }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("action"));

    let app = common::build_test_app(pool.clone());
    let response = post_raw_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps"),
        r#"{"action": "unterminated"#,
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    assert!(live_steps(&pool, id).await.is_empty());
    assert_eq!(versions(&pool, id).await.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_step_of_other_test_case_returns_404(pool: PgPool) {
    let a = create_test_case(&pool, "A").await;
    let b = create_test_case(&pool, "B").await;
    add_step(&pool, "test-cases", a, "mine").await;
    let step_id = live_steps(&pool, a).await[0]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(
        app,
        &format!("/api/v1/test-cases/{b}/steps/{step_id}"),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(live_steps(&pool, a).await.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_revert_to_foreign_version_returns_404(pool: PgPool) {
    let a = create_test_case(&pool, "A").await;
    let b = create_test_case(&pool, "B").await;
    let foreign = versions(&pool, b).await[0]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool);
    let response = post_auth(
        app,
        &format!("/api/v1/test-cases/{a}/versions/{foreign}/revert"),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Clone
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_clone_returns_201_with_fresh_history(pool: PgPool) {
    let id = create_test_case(&pool, "Checkout").await;
    add_step(&pool, "test-cases", id, "add item").await;
    add_step(&pool, "test-cases", id, "pay").await;

    let app = common::build_test_app(pool.clone());
    let response = post_auth(
        app,
        &format!("/api/v1/test-cases/{id}/clone"),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let clone_id = json["data"]["parent"]["id"].as_i64().unwrap();
    assert_ne!(clone_id, id);
    assert_eq!(json["data"]["parent"]["name"], "Checkout (Copy)");
    assert_eq!(json["data"]["version"]["version"], "1.0.0");

    assert_eq!(versions(&pool, clone_id).await.len(), 1);
    let actions: Vec<String> = live_steps(&pool, clone_id)
        .await
        .iter()
        .map(|s| s["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["add item", "pay"]);
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_fixture_routes_share_the_engine(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/fixtures",
        json!({ "name": "Logged-in user" }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let fixture_id = body_json(response).await["data"]["parent"]["id"]
        .as_i64()
        .unwrap();

    assert_eq!(add_step(&pool, "fixtures", fixture_id, "seed user").await, "1.0.1");

    // Test-case steps may point at the fixture...
    let id = create_test_case(&pool, "Uses fixture").await;
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps"),
        json!({ "action": "log in", "fixture_id": fixture_id }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // ...but fixture steps may not.
    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        &format!("/api/v1/fixtures/{fixture_id}/steps"),
        json!({ "action": "nested", "fixture_id": fixture_id }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_deleting_referenced_fixture_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/fixtures",
        json!({ "name": "Shared cart" }),
        &creator_token(),
    )
    .await;
    let fixture_id = body_json(response).await["data"]["parent"]["id"]
        .as_i64()
        .unwrap();
    let id = create_test_case(&pool, "Checkout").await;
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps"),
        json!({ "action": "use cart", "fixture_id": fixture_id }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(
        app,
        &format!("/api/v1/fixtures/{fixture_id}"),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    assert_eq!(live_steps(&pool, id).await[0]["fixture_id"], fixture_id);
    assert_eq!(versions(&pool, id).await.len(), 2);
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_missing_token_returns_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/test-cases").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_viewer_cannot_mutate(pool: PgPool) {
    let id = create_test_case(&pool, "Read only").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/test-cases/{id}/steps"),
        json!({ "action": "sneaky" }),
        &viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(versions(&pool, id).await.len(), 1);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_mutations_publish_version_created(pool: PgPool) {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let app = common::build_test_app_with_bus(pool, Arc::clone(&bus));
    let response = post_json_auth(
        app,
        "/api/v1/test-cases",
        json!({ "name": "Announced" }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["parent"]["id"]
        .as_i64()
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.actor_user_id, Some(CREATOR_ID));
    let created = VersionCreated::from_event(&event).expect("version_created event");
    assert_eq!(created.parent_id, id);
    assert_eq!(created.version, "1.0.0");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_failed_mutation_publishes_nothing(pool: PgPool) {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let app = common::build_test_app_with_bus(pool, Arc::clone(&bus));
    let response = post_json_auth(
        app,
        "/api/v1/test-cases/999999/steps",
        json!({ "action": "orphan" }),
        &creator_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(rx.try_recv().is_err());
}
