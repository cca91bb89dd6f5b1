//! End-to-end tests for content, tags, search and the SEO routes

mod common;

use common::{Auth, TestApp, TestUser};
use hyper::{Method, StatusCode};
use serde_json::{json, Value};

/// Admin plus a contributor, the usual authoring setup
async fn authors(app: &TestApp) -> (TestUser, TestUser) {
    let admin = app.register("editor").await;
    let writer = app.register("writer").await;
    app.set_role(&admin, &writer, "contributor").await;
    (admin, writer)
}

async fn create(app: &TestApp, author: &TestUser, body: Value) -> Value {
    let response = app.post("/content", Auth::Bearer(&author.token), body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    response.json()
}

fn slugs(list: &Value) -> Vec<String> {
    list["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["slug"].as_str().unwrap().to_string())
        .collect()
}

/// Drafts stay hidden until published
#[tokio::test]
async fn test_draft_then_publish() {
    let app = TestApp::new();
    let (_, writer) = authors(&app).await;

    let draft = create(
        &app,
        &writer,
        json!({ "title": "Hello, World", "body": "First post", "tags": ["Rust"] }),
    )
    .await;
    assert_eq!(draft["slug"], "hello-world");
    assert_eq!(draft["status"], "draft");
    assert!(draft["publishedAt"].is_null());
    assert_eq!(draft["authorUsername"], "writer");

    let anonymous = app.get("/content/hello-world", Auth::None).await;
    assert_eq!(anonymous.status, StatusCode::NOT_FOUND);

    let own = app
        .get("/content/hello-world", Auth::Bearer(&writer.token))
        .await;
    assert_eq!(own.status, StatusCode::OK);

    let listed = app.get("/content", Auth::None).await;
    assert!(slugs(&listed.json()).is_empty());

    let id = draft["id"].as_str().unwrap();
    let published = app
        .put(
            &format!("/content/{}", id),
            Auth::Bearer(&writer.token),
            json!({ "status": "published" }),
        )
        .await;
    assert_eq!(published.status, StatusCode::OK);
    assert_eq!(published.json()["status"], "published");
    assert!(published.json()["publishedAt"].is_string());
    assert_eq!(published.json()["title"], "Hello, World");

    let anonymous = app.get("/content/hello-world", Auth::None).await;
    assert_eq!(anonymous.status, StatusCode::OK);

    let listed = app.get("/content", Auth::None).await;
    assert_eq!(slugs(&listed.json()), vec!["hello-world"]);
}

#[tokio::test]
async fn test_viewer_cannot_write() {
    let app = TestApp::new();
    app.register("editor").await;
    let viewer = app.register("reader").await;

    let response = app
        .post(
            "/content",
            Auth::Bearer(&viewer.token),
            json!({ "title": "Nope", "body": "..." }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .post("/content", Auth::None, json!({ "title": "Nope", "body": "..." }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_slug() {
    let app = TestApp::new();
    let (admin, writer) = authors(&app).await;

    create(&app, &writer, json!({ "title": "Same", "body": "a" })).await;

    let response = app
        .post(
            "/content",
            Auth::Bearer(&admin.token),
            json!({ "title": "Other", "slug": "same", "body": "b" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

/// Contributors manage their own content, admins manage everything
#[tokio::test]
async fn test_ownership() {
    let app = TestApp::new();
    let (admin, writer) = authors(&app).await;
    let rival = app.register("rival").await;
    app.set_role(&admin, &rival, "contributor").await;

    let post = create(&app, &writer, json!({ "title": "Mine", "body": "text" })).await;
    let path = format!("/content/{}", post["id"].as_str().unwrap());

    let response = app
        .put(&path, Auth::Bearer(&rival.token), json!({ "title": "Theirs" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.delete(&path, Auth::Bearer(&rival.token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .put(&path, Auth::Bearer(&admin.token), json!({ "title": "Edited" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "Edited");
    assert_eq!(response.json()["slug"], "mine");

    let response = app.delete(&path, Auth::Bearer(&writer.token)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get("/content/mine", Auth::Bearer(&writer.token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_content_validation() {
    let app = TestApp::new();
    let (_, writer) = authors(&app).await;

    let response = app
        .post(
            "/content",
            Auth::Bearer(&writer.token),
            json!({ "title": "   ", "body": "x" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/content",
            Auth::Bearer(&writer.token),
            json!({ "title": "x".repeat(201), "body": "x" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .send(Method::POST, "/content", Auth::Bearer(&writer.token), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tags_and_filtering() {
    let app = TestApp::new();
    let (_, writer) = authors(&app).await;

    create(
        &app,
        &writer,
        json!({
            "title": "Async Rust",
            "body": "tokio all the way",
            "tags": ["Rust", "Async", "rust"],
            "status": "published",
        }),
    )
    .await;
    create(
        &app,
        &writer,
        json!({
            "title": "Web Basics",
            "body": "html and css",
            "tags": ["Web Dev"],
            "status": "published",
        }),
    )
    .await;

    let tags = app.get("/tags", Auth::None).await;
    assert_eq!(tags.status, StatusCode::OK);
    let tag_slugs: Vec<String> = tags
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(tag_slugs, vec!["async", "rust", "web-dev"]);

    let listed = app.get("/content?tag=Rust", Auth::None).await;
    assert_eq!(slugs(&listed.json()), vec!["async-rust"]);

    let listed = app.get("/content?tag=web-dev", Auth::None).await;
    assert_eq!(slugs(&listed.json()), vec!["web-basics"]);
}

#[tokio::test]
async fn test_listing_pagination() {
    let app = TestApp::new();
    let (_, writer) = authors(&app).await;

    for title in ["One", "Two", "Three"] {
        create(
            &app,
            &writer,
            json!({ "title": title, "body": "b", "status": "published" }),
        )
        .await;
    }

    let page = app.get("/content?limit=2", Auth::None).await.json();
    assert_eq!(page["limit"], 2);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let rest = app.get("/content?limit=2&offset=2", Auth::None).await.json();
    assert_eq!(rest["items"].as_array().unwrap().len(), 1);

    let capped = app.get("/content?limit=5000", Auth::None).await.json();
    assert_eq!(capped["limit"], 100);
}

#[tokio::test]
async fn test_search() {
    let app = TestApp::new();
    let (_, writer) = authors(&app).await;

    create(
        &app,
        &writer,
        json!({ "title": "Borrow checker", "body": "lifetimes explained", "status": "published" }),
    )
    .await;
    create(
        &app,
        &writer,
        json!({ "title": "Hidden lifetimes", "body": "draft notes" }),
    )
    .await;

    let response = app.get("/search?q=LIFETIMES", Auth::None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(slugs(&response.json()), vec!["borrow-checker"]);

    let response = app.get("/search?q=%20", Auth::None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/search", Auth::None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sitemap_lists_published_only() {
    let app = TestApp::new();
    let (_, writer) = authors(&app).await;

    create(
        &app,
        &writer,
        json!({ "title": "Public & Proud", "body": "b", "status": "published" }),
    )
    .await;
    create(&app, &writer, json!({ "title": "Secret", "body": "b" })).await;

    let response = app.get("/sitemap.xml", Auth::None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.as_ref().unwrap().starts_with("application/xml"));

    let xml = response.text();
    assert!(xml.contains("<loc>https://blog.example.com/</loc>"));
    assert!(xml.contains("<loc>https://blog.example.com/content/public-proud</loc>"));
    assert!(!xml.contains("secret"));

    let robots = app.get("/robots.txt", Auth::None).await;
    assert_eq!(robots.status, StatusCode::OK);
    assert!(robots
        .text()
        .contains("Sitemap: https://blog.example.com/sitemap.xml"));
}

#[tokio::test]
async fn test_health_and_fallbacks() {
    let app = TestApp::new();

    let health = app.get("/health", Auth::None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json()["healthy"], true);
    assert_eq!(health.json()["store"], "memory");
    assert_eq!(health.json()["mode"], "development");

    let missing = app.get("/nowhere", Auth::None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let missing = app.get("/contentious", Auth::None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let preflight = app.send(Method::OPTIONS, "/content", Auth::None, None).await;
    assert_eq!(preflight.status, StatusCode::NO_CONTENT);
}
