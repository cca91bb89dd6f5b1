//! Shared helpers for driving the router in-process

#![allow(dead_code)]

use bytes::Bytes;
use clap::Parser;
use http_body_util::BodyExt;
use hyper::{Method, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use lectern::auth::TokenCodec;
use lectern::store::MemoryStore;
use lectern::{route, AppState, Args};

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-characters";

/// Credential to attach to a request
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    ApiKey(&'a str),
    Both { token: &'a str, key: &'a str },
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn error(&self) -> String {
        self.json()["error"].as_str().unwrap_or_default().to_string()
    }
}

/// A registered account and its bearer token
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let args = Args::try_parse_from([
            "lectern",
            "--dev-mode",
            "--memory-store",
            "--public-url",
            "https://blog.example.com",
        ])
        .unwrap();
        let codec = TokenCodec::new(TEST_SECRET, Duration::from_secs(3600)).unwrap();
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(args, Arc::clone(&store), codec));
        Self { state, store }
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        auth: Auth<'_>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        match auth {
            Auth::None => {}
            Auth::Bearer(token) => {
                builder = builder.header("authorization", format!("Bearer {token}"));
            }
            Auth::ApiKey(key) => {
                builder = builder.header("x-api-key", key);
            }
            Auth::Both { token, key } => {
                builder = builder
                    .header("authorization", format!("Bearer {token}"))
                    .header("x-api-key", key);
            }
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Bytes::from(serde_json::to_vec(&json).unwrap())
            }
            None => Bytes::new(),
        };

        let response = route(&self.state, builder.body(body).unwrap()).await;
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn get(&self, path: &str, auth: Auth<'_>) -> TestResponse {
        self.send(Method::GET, path, auth, None).await
    }

    pub async fn post(&self, path: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.send(Method::POST, path, auth, Some(body)).await
    }

    pub async fn put(&self, path: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.send(Method::PUT, path, auth, Some(body)).await
    }

    pub async fn delete(&self, path: &str, auth: Auth<'_>) -> TestResponse {
        self.send(Method::DELETE, path, auth, None).await
    }

    pub async fn register(&self, username: &str) -> TestUser {
        let response = self
            .post(
                "/auth/register",
                Auth::None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "correct-horse-battery",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());

        let json = response.json();
        TestUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            username: json["user"]["username"].as_str().unwrap().to_string(),
            token: json["token"].as_str().unwrap().to_string(),
        }
    }

    /// Create an API key for the user and return the raw key
    pub async fn create_api_key(&self, user: &TestUser, name: &str) -> (String, String) {
        let response = self
            .post(
                "/api-keys",
                Auth::Bearer(&user.token),
                serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());

        let json = response.json();
        (
            json["id"].as_str().unwrap().to_string(),
            json["key"].as_str().unwrap().to_string(),
        )
    }

    pub async fn set_role(&self, admin: &TestUser, user: &TestUser, role: &str) {
        let response = self
            .put(
                &format!("/admin/users/{}/role", user.id),
                Auth::Bearer(&admin.token),
                serde_json::json!({ "role": role }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    }
}
