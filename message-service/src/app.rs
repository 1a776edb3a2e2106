use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use common_auth::TokenService;
use common_http_errors::ApiError;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::message_handlers::{list_messages, post_message};
use crate::metrics::{track_auth_rejections, MessagingMetrics};
use crate::passwords::PasswordHasher;
use crate::store::KvStore;
use crate::user_handlers::{login_user, register_user};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub tokens: Arc<TokenService>,
    pub passwords: Arc<dyn PasswordHasher>,
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<MessagingMetrics>,
    pub send_clock: Arc<SendClock>,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for Arc<MessagingMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

impl AppState {
    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }
}

/// Hands out strictly increasing message timestamps (microsecond resolution).
#[derive(Debug, Default)]
pub struct SendClock {
    last_micros: AtomicI64,
}

impl SendClock {
    pub fn next(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.timestamp_micros();
        let mut previous = self.last_micros.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last_micros.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(candidate).unwrap_or_default(),
                Err(actual) => previous = actual,
            }
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => ApiError::internal(err).into_response(),
    }
}

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route(
            "/groups/:group/messages",
            post(post_message).get(list_messages),
        )
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_auth_rejections,
        ));

    let router = match cors_layer(&state.config.cors_allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]),
    )
}
