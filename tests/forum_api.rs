//! End-to-end API tests over the full router, one throwaway database per
//! test via #[sqlx::test] (crate migrations applied automatically).

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, FixedOffset};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use tribune::{
    auth,
    config::{AdminConfig, Config, DatabaseConfig, SecurityConfig, ServerConfig},
    db::Database,
    models::{Profile, User},
    AppState,
};

fn test_app(pool: PgPool) -> (Router, Database) {
    let db = Database::new(pool);
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        },
        security: SecurityConfig {
            cors_origins: "*".to_string(),
        },
        admin: AdminConfig::default(),
    };
    let app = tribune::app(AppState {
        db: db.clone(),
        config: Arc::new(config),
    });
    (app, db)
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

const PASSWORD: &str = "testpass123";

/// Register a user directly through the db layer and mint a token for it
async fn sample_user(db: &Database, email: &str) -> (User, Profile, String) {
    let hash = auth::hash_password(PASSWORD).unwrap();
    let (user, profile) = db.create_user(email, &hash).await.unwrap();
    let token = auth::generate_token();
    db.create_token(user.id, &auth::hash_token(&token))
        .await
        .unwrap();
    (user, profile, token)
}

async fn sample_superuser(db: &Database, email: &str) -> (User, Profile, String) {
    let hash = auth::hash_password(PASSWORD).unwrap();
    let (user, profile) = db.create_superuser(email, &hash).await.unwrap();
    let token = auth::generate_token();
    db.create_token(user.id, &auth::hash_token(&token))
        .await
        .unwrap();
    (user, profile, token)
}

async fn table_count(pool: &PgPool, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

fn parse_ts(value: &Value) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap()).unwrap()
}

#[sqlx::test]
async fn register_creates_profile_and_hashes_password(pool: PgPool) {
    let (app, db) = test_app(pool);

    let (status, body) = request(
        &app,
        Method::POST,
        "/auth/create",
        None,
        Some(json!({"email": "Test@MARSIMON.COM", "password": PASSWORD})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    // Domain is normalized, local part preserved, password never exposed
    assert_eq!(body["email"], "Test@marsimon.com");
    assert!(body.get("password").is_none());
    assert_eq!(body["is_superuser"], false);

    let user = db
        .get_user_by_email("Test@marsimon.com")
        .await
        .unwrap()
        .expect("user persisted");
    assert!(auth::verify_password(PASSWORD, &user.password_hash));

    let profile = db.get_profile_by_user(user.id).await.unwrap();
    assert!(profile.username.starts_with("guest"));
    assert_eq!(profile.username.len(), "guest".len() + 16);
}

#[sqlx::test]
async fn register_rejects_blank_email_and_persists_nothing(pool: PgPool) {
    let (app, _db) = test_app(pool.clone());

    let (status, body) = request(
        &app,
        Method::POST,
        "/auth/create",
        None,
        Some(json!({"email": "", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");

    let (status, _) = request(
        &app,
        Method::POST,
        "/auth/create",
        None,
        Some(json!({"password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(table_count(&pool, "users").await, 0);
    assert_eq!(table_count(&pool, "profiles").await, 0);
}

#[sqlx::test]
async fn register_rejects_short_password(pool: PgPool) {
    let (app, _db) = test_app(pool.clone());

    let (status, _) = request(
        &app,
        Method::POST,
        "/auth/create",
        None,
        Some(json!({"email": "test@marsimon.com", "password": "1234"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(table_count(&pool, "users").await, 0);
}

#[sqlx::test]
async fn guest_usernames_are_distinct(pool: PgPool) {
    let (_app, db) = test_app(pool);

    let (_, first, _) = sample_user(&db, "first@marsimon.com").await;
    let (_, second, _) = sample_user(&db, "second@marsimon.com").await;

    assert_ne!(first.username, second.username);
}

#[sqlx::test]
async fn token_exchange_and_me(pool: PgPool) {
    let (app, db) = test_app(pool);
    let (user, _, _) = sample_user(&db, "test@marsimon.com").await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/auth/token",
        None,
        Some(json!({"email": "test@marsimon.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("tribune_"));

    let (status, body) = request(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "test@marsimon.com");
    assert_eq!(body["id"], user.id);

    // No credential at all
    let (status, _) = request(&app, Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn token_exchange_failures_are_undifferentiated(pool: PgPool) {
    let (app, db) = test_app(pool.clone());
    sample_user(&db, "test@marsimon.com").await;

    let cases = [
        json!({"email": "test@marsimon.com", "password": "wrongpass"}),
        json!({"email": "nobody@marsimon.com", "password": PASSWORD}),
    ];

    let mut messages = Vec::new();
    for body in cases {
        let (status, resp) = request(&app, Method::POST, "/auth/token", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"]["code"], "authorization");
        messages.push(resp["error"]["message"].clone());
    }

    // Deactivated account fails the same way
    sqlx::query("UPDATE users SET is_active = FALSE")
        .execute(&pool)
        .await
        .unwrap();
    let (status, resp) = request(
        &app,
        Method::POST,
        "/auth/token",
        None,
        Some(json!({"email": "test@marsimon.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    messages.push(resp["error"]["message"].clone());

    assert!(messages.windows(2).all(|w| w[0] == w[1]));
}

#[sqlx::test]
async fn topic_creation_is_compound(pool: PgPool) {
    let (app, db) = test_app(pool);
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let (_, profile, token) = sample_user(&db, "test@marsimon.com").await;

    let uri = format!("/boards/{}/topics", board.id);
    let (status, body) = request(
        &app,
        Method::POST,
        &uri,
        Some(&token),
        Some(json!({"title": "A new topic", "message": "Message about the topic"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "A new topic");
    assert_eq!(body["board"], board.id);
    assert_eq!(body["posts"][0]["message"], "Message about the topic");
    assert_eq!(body["posts"][0]["edited_at"], Value::Null);
    assert_eq!(body["starter"]["username"], profile.username);
    assert_eq!(
        body["starter"]["href"],
        format!("/users/profiles/{}", profile.id)
    );

    // The list view derives post_count and first_post; no topic created
    // through this path is ever observable with zero posts.
    let (status, list) = request(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = list.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["post_count"], 1);
    assert_eq!(items[0]["first_post"]["message"], "Message about the topic");
}

#[sqlx::test]
async fn topic_creation_requires_auth(pool: PgPool) {
    let (app, db) = test_app(pool.clone());
    let board = db.create_board("Test board", "Board description").await.unwrap();

    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/boards/{}/topics", board.id),
        None,
        Some(json!({"title": "A new topic", "message": "Message about the topic"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(table_count(&pool, "topics").await, 0);
    assert_eq!(table_count(&pool, "posts").await, 0);
}

#[sqlx::test]
async fn post_edit_moves_message_and_edited_at_together(pool: PgPool) {
    let (app, db) = test_app(pool);
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let (_, profile, token) = sample_user(&db, "test@marsimon.com").await;
    let (topic, post) = db
        .create_topic_with_first_post(board.id, profile.id, "Test topic", "Test post message")
        .await
        .unwrap();

    assert!(post.edited_at.is_none());

    let uri = format!("/boards/{}/topics/{}/posts/{}", board.id, topic.id, post.id);

    let (status, body) = request(
        &app,
        Method::PATCH,
        &uri,
        Some(&token),
        Some(json!({"message": "New post message"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "New post message");
    assert!(!body["edited_at"].is_null());
    let first_edit = parse_ts(&body["edited_at"]);

    // A second edit advances edited_at again
    let (status, body) = request(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({"message": "Even newer message"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Even newer message");
    let second_edit = parse_ts(&body["edited_at"]);
    assert!(second_edit >= first_edit);

    // A bodyless update is a no-op: edited_at must not move
    let (status, body) = request(&app, Method::PATCH, &uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Even newer message");
    assert_eq!(parse_ts(&body["edited_at"]), second_edit);
}

#[sqlx::test]
async fn permission_matrix(pool: PgPool) {
    let (app, db) = test_app(pool);
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let (_, owner_profile, owner_token) = sample_user(&db, "owner@marsimon.com").await;
    let (_, _, other_token) = sample_user(&db, "other@marsimon.com").await;
    let (_, _, admin_token) = sample_superuser(&db, "super@marsimon.com").await;

    let (topic, _) = db
        .create_topic_with_first_post(board.id, owner_profile.id, "Test topic", "Test post")
        .await
        .unwrap();

    let board_uri = format!("/boards/{}", board.id);
    let topic_uri = format!("/boards/{}/topics/{}", board.id, topic.id);

    // (a) anonymous board write
    let (status, _) = request(
        &app,
        Method::PATCH,
        &board_uri,
        None,
        Some(json!({"title": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // (b) authenticated non-superuser board write
    let (status, _) = request(
        &app,
        Method::PATCH,
        &board_uri,
        Some(&owner_token),
        Some(json!({"title": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(db.get_board(board.id).await.unwrap().title, "Test board");

    // (c) authenticated non-owner topic write
    let (status, _) = request(
        &app,
        Method::PATCH,
        &topic_uri,
        Some(&other_token),
        Some(json!({"title": "Hijacked topic"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(db.get_topic(topic.id).await.unwrap().title, "Test topic");

    // (d) owner topic write
    let (status, body) = request(
        &app,
        Method::PATCH,
        &topic_uri,
        Some(&owner_token),
        Some(json!({"title": "New topic title"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "New topic title");
    assert_eq!(
        db.get_topic(topic.id).await.unwrap().title,
        "New topic title"
    );

    // (e) superuser board write
    let (status, _) = request(
        &app,
        Method::PATCH,
        &board_uri,
        Some(&admin_token),
        Some(json!({"title": "Renamed board"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.get_board(board.id).await.unwrap().title, "Renamed board");

    // Superuser may also modify topics they did not start
    let (status, _) = request(
        &app,
        Method::PATCH,
        &topic_uri,
        Some(&admin_token),
        Some(json!({"title": "Admin renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Board creation is superuser-only as well
    let (status, _) = request(
        &app,
        Method::POST,
        "/boards",
        Some(&owner_token),
        Some(json!({"title": "Another board", "description": "d"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = request(
        &app,
        Method::POST,
        "/boards",
        Some(&admin_token),
        Some(json!({"title": "Another board", "description": "d"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test]
async fn post_ownership(pool: PgPool) {
    let (app, db) = test_app(pool);
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let (_, author_profile, author_token) = sample_user(&db, "author@marsimon.com").await;
    let (_, _, other_token) = sample_user(&db, "other@marsimon.com").await;

    let (topic, post) = db
        .create_topic_with_first_post(board.id, author_profile.id, "Test topic", "Test post")
        .await
        .unwrap();
    let post_uri = format!("/boards/{}/topics/{}/posts/{}", board.id, topic.id, post.id);

    // Reads are public
    let (status, body) = request(&app, Method::GET, &post_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"]["username"], author_profile.username);

    // Any authenticated user may reply
    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/boards/{}/topics/{}/posts", board.id, topic.id),
        Some(&other_token),
        Some(json!({"message": "A reply"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Only the author (or a superuser) may edit or delete
    let (status, _) = request(
        &app,
        Method::PATCH,
        &post_uri,
        Some(&other_token),
        Some(json!({"message": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, Method::DELETE, &post_uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, Method::DELETE, &post_uri, Some(&author_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(db.get_post(post.id).await.is_err());
}

#[sqlx::test]
async fn profile_ownership(pool: PgPool) {
    let (app, db) = test_app(pool);
    let (_, profile, token) = sample_user(&db, "test@marsimon.com").await;
    let (_, other_profile, other_token) = sample_user(&db, "other@marsimon.com").await;

    let uri = format!("/users/profiles/{}", profile.id);

    // Reads are public
    let (status, body) = request(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], profile.username);

    // Writes are owner-only
    let (status, _) = request(
        &app,
        Method::PATCH,
        &uri,
        Some(&other_token),
        Some(json!({"username": "impostor"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(
        &app,
        Method::PATCH,
        &uri,
        Some(&token),
        Some(json!({"username": "newhandle"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "newhandle");

    // Username uniqueness surfaces as a validation failure
    let (status, body) = request(
        &app,
        Method::PATCH,
        &format!("/users/profiles/{}", other_profile.id),
        Some(&other_token),
        Some(json!({"username": "newhandle"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");
}

#[sqlx::test]
async fn profile_deletion_detaches_authorship(pool: PgPool) {
    let (_app, db) = test_app(pool);
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let (_, profile, _) = sample_user(&db, "test@marsimon.com").await;
    let (topic, post) = db
        .create_topic_with_first_post(board.id, profile.id, "Test topic", "Test post")
        .await
        .unwrap();

    db.delete_profile(profile.id).await.unwrap();

    // Content survives with ownership nulled out, not deleted
    let topic = db.get_topic(topic.id).await.unwrap();
    assert_eq!(topic.starter_id, None);
    let post = db.get_post(post.id).await.unwrap();
    assert_eq!(post.author_id, None);
    assert_eq!(post.message, "Test post");
}

#[sqlx::test]
async fn board_deletion_cascades(pool: PgPool) {
    let (app, db) = test_app(pool.clone());
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let (_, profile, _) = sample_user(&db, "test@marsimon.com").await;
    let (_, _, admin_token) = sample_superuser(&db, "super@marsimon.com").await;
    db.create_topic_with_first_post(board.id, profile.id, "Test topic", "Test post")
        .await
        .unwrap();

    let (status, _) = request(
        &app,
        Method::DELETE,
        &format!("/boards/{}", board.id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(table_count(&pool, "topics").await, 0);
    assert_eq!(table_count(&pool, "posts").await, 0);
}

#[sqlx::test]
async fn nested_paths_scope_404s(pool: PgPool) {
    let (app, db) = test_app(pool);
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let other_board = db.create_board("Other board", "Other description").await.unwrap();
    let (_, profile, _) = sample_user(&db, "test@marsimon.com").await;
    let (topic, _) = db
        .create_topic_with_first_post(board.id, profile.id, "Test topic", "Test post")
        .await
        .unwrap();

    // A topic reached through the wrong parent board does not resolve
    let (status, _) = request(
        &app,
        Method::GET,
        &format!("/boards/{}/topics/{}", other_board.id, topic.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(&app, Method::GET, "/boards/9999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        &app,
        Method::GET,
        &format!("/boards/{}/topics/9999", board.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn board_projection_embeds_topic_refs_only(pool: PgPool) {
    let (app, db) = test_app(pool);
    let board = db.create_board("Test board", "Board description").await.unwrap();
    let (_, profile, _) = sample_user(&db, "test@marsimon.com").await;
    let (topic, _) = db
        .create_topic_with_first_post(board.id, profile.id, "Test topic", "Test post")
        .await
        .unwrap();

    let (status, body) = request(&app, Method::GET, "/boards", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let boards = body.as_array().unwrap();
    assert_eq!(boards.len(), 1);
    let topics = boards[0]["topics"].as_array().unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0]["title"], "Test topic");
    assert_eq!(
        topics[0]["href"],
        format!("/boards/{}/topics/{}", board.id, topic.id)
    );
    // Compact references only: the nested post tree stays out of the payload
    assert!(topics[0].get("posts").is_none());
}

#[sqlx::test]
async fn duplicate_titles_fail_validation(pool: PgPool) {
    let (app, db) = test_app(pool);
    db.create_board("Test board", "Board description").await.unwrap();
    let (_, _, admin_token) = sample_superuser(&db, "super@marsimon.com").await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/boards",
        Some(&admin_token),
        Some(json!({"title": "Test board", "description": "dup"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");
}

#[sqlx::test]
async fn update_me_rehashes_password(pool: PgPool) {
    let (app, db) = test_app(pool);
    let (user, _, token) = sample_user(&db, "test@marsimon.com").await;

    let (status, body) = request(
        &app,
        Method::PATCH,
        "/auth/me",
        Some(&token),
        Some(json!({"password": "freshpassword"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "test@marsimon.com");

    let user = db.get_user(user.id).await.unwrap();
    assert!(auth::verify_password("freshpassword", &user.password_hash));
    assert!(!auth::verify_password(PASSWORD, &user.password_hash));
}
