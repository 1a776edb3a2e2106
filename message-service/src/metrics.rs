use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use common_auth::AuthRejection;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct MessagingMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    token_rejections: IntCounterVec,
}

impl MessagingMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "messaging_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let token_rejections = IntCounterVec::new(
            Opts::new(
                "messaging_token_rejections_total",
                "Count of rejected bearer tokens grouped by failure kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(token_rejections.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            token_rejections,
        })
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn token_rejected(&self, kind: &str) {
        self.token_rejections.with_label_values(&[kind]).inc();
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}

/// Counts 401s produced by the bearer extractor, keyed by why the token was refused.
pub async fn track_auth_rejections(
    State(metrics): State<Arc<MessagingMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if let Some(rejection) = response.extensions().get::<AuthRejection>() {
        metrics.token_rejected(rejection.kind);
    }
    response
}
