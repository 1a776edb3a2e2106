use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Uuid>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, message: Option<String> },
    /// Always answered with a `Bearer` challenge.
    Unauthorized { code: &'static str },
    Conflict { code: &'static str, message: Option<String> },
    Internal { trace_id: Uuid },
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest { code, message: Some(message.into()) }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict { code, message: Some(message.into()) }
    }

    /// Log `err` under a fresh trace id and hide its details from the client.
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        let trace_id = Uuid::new_v4();
        error!(%trace_id, error = %err, "internal error");
        Self::Internal { trace_id }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. }
            | ApiError::Unauthorized { code }
            | ApiError::Conflict { code, .. } => code,
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let challenge = matches!(self, ApiError::Unauthorized { .. });
        let body = match self {
            ApiError::BadRequest { message, .. } | ApiError::Conflict { message, .. } => ErrorBody {
                code: code.into(),
                message,
                trace_id: None,
            },
            ApiError::Unauthorized { .. } => ErrorBody {
                code: code.into(),
                message: None,
                trace_id: None,
            },
            ApiError::Internal { trace_id } => ErrorBody {
                code: code.into(),
                message: None,
                trace_id: Some(trace_id),
            },
        };

        let mut resp = (status, Json(body)).into_response();
        resp.headers_mut()
            .insert(ERROR_CODE_HEADER, HeaderValue::from_static(code));
        if challenge {
            resp.headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
