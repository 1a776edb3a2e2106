#![allow(dead_code)]

use std::sync::Arc;

use argon2::Params;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common_auth::{Algorithm, FixedClock, JwtKey, TokenService, TokenServiceConfig};
use http_body_util::BodyExt;
use message_service::{
    app::SendClock, build_router, config::ServiceConfig, metrics::MessagingMetrics,
    passwords::Argon2Passwords, store::InMemoryStore, AppState,
};
use serde_json::Value;
use tower::util::ServiceExt;

pub const NOW: i64 = 1_700_000_000;
pub const SECRET: &[u8] = b"message-service-test-secret";

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<FixedClock>,
}

pub fn test_app() -> TestApp {
    test_app_with(ServiceConfig {
        token_ttl_seconds: 300,
        ..ServiceConfig::default()
    })
}

pub fn test_app_with(config: ServiceConfig) -> TestApp {
    let clock = Arc::new(FixedClock::new(NOW));
    let key = JwtKey::hmac(Algorithm::HS256, SECRET).expect("hmac key");
    let tokens = TokenService::new(TokenServiceConfig::new(key).with_clock(clock.clone()));
    let passwords =
        Argon2Passwords::new(Params::new(8, 1, 1, None).expect("params")).expect("hasher");

    let state = AppState {
        store: Arc::new(InMemoryStore::new()),
        tokens: Arc::new(tokens),
        passwords: Arc::new(passwords),
        config: Arc::new(config),
        metrics: Arc::new(MessagingMetrics::new().expect("metrics")),
        send_clock: Arc::new(SendClock::default()),
    };

    TestApp {
        router: build_router(state),
        clock,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("utf8 body")
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.send(
            "POST",
            "/register",
            None,
            Some(serde_json::json!({"username": username, "password": password})),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.send(
            "POST",
            "/login",
            None,
            Some(serde_json::json!({"username": username, "password": password})),
        )
        .await
    }

    /// Registers `username` and returns a fresh bearer token for it.
    pub async fn signed_in(&self, username: &str) -> String {
        let password = format!("{username}-password");
        assert_eq!(self.register(username, &password).await.status, StatusCode::CREATED);
        let login = self.login(username, &password).await;
        assert_eq!(login.status, StatusCode::OK);
        login.json()["token"].as_str().expect("token").to_owned()
    }
}
