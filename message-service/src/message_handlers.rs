use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::store::{decode_record, group_prefix, message_key};
use crate::validation;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub group: String,
    pub author: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct NewMessage {
    pub text: String,
}

/// Raw query values; parsed by hand so bad input gets a JSON error body.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub since: Option<String>,
    pub limit: Option<String>,
}

pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(group): Path<String>,
    Json(new_message): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    validation::group(&group)?;
    let text = validation::message_text(&new_message.text)?.to_owned();

    let message = Message {
        id: Uuid::new_v4(),
        group,
        author: auth.subject().to_owned(),
        text,
        sent_at: state.send_clock.next(Utc::now()),
    };
    let bytes = serde_json::to_vec(&message).map_err(ApiError::internal)?;
    state
        .store
        .set(&message_key(&message.group, message.sent_at, message.id), bytes)
        .await
        .map_err(ApiError::internal)?;

    debug!(group = %message.group, author = %message.author, id = %message.id, "message stored");
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(group): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Message>>> {
    validation::group(&group)?;
    let since = params.since.as_deref().map(parse_since).transpose()?;
    let limit = params.limit.as_deref().map(parse_limit).transpose()?;

    let entries = state
        .store
        .scan_prefix(&group_prefix(&group))
        .await
        .map_err(ApiError::internal)?;

    let mut messages = Vec::with_capacity(entries.len());
    for (key, bytes) in entries {
        let message: Message = decode_record(&key, &bytes).map_err(ApiError::internal)?;
        if since.map_or(true, |since| message.sent_at > since) {
            messages.push(message);
        }
    }

    if let Some(limit) = limit {
        let skip = messages.len().saturating_sub(limit);
        messages.drain(..skip);
    }

    Ok(Json(messages))
}

fn parse_since(value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request("invalid_since", "since must be an RFC 3339 timestamp"))
}

fn parse_limit(value: &str) -> Result<usize, ApiError> {
    match value.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ApiError::bad_request(
            "invalid_limit",
            "limit must be a positive integer",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_accepts_offsets() {
        let since = parse_since("2024-01-01T01:00:00+01:00").unwrap();
        assert_eq!(since.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(parse_since("yesterday").is_err());
    }

    #[test]
    fn limit_must_be_positive() {
        assert_eq!(parse_limit("3").unwrap(), 3);
        assert!(parse_limit("0").is_err());
        assert!(parse_limit("-1").is_err());
        assert!(parse_limit("many").is_err());
    }
}
