use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{decode_record, user_key};
use crate::validation;
use crate::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<RegisteredUser>)> {
    let Credentials { username, password } = credentials;
    validation::username(&username)?;
    validation::password(&password)?;

    let passwords = state.passwords.clone();
    let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    let record = UserRecord {
        username: username.clone(),
        password_hash,
        created_at: Utc::now(),
    };
    let bytes = serde_json::to_vec(&record).map_err(ApiError::internal)?;

    let inserted = state
        .store
        .insert_if_absent(&user_key(&username), bytes)
        .await
        .map_err(ApiError::internal)?;
    if !inserted {
        return Err(ApiError::conflict(
            "username_taken",
            "username is already registered",
        ));
    }

    info!(%username, "registered user");
    Ok((StatusCode::CREATED, Json(RegisteredUser { username })))
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<LoginResponse>> {
    let Credentials { username, password } = credentials;

    let key = user_key(&username);
    let record = match state.store.get(&key).await {
        Ok(Some(bytes)) => Some(decode_record::<UserRecord>(&key, &bytes).map_err(|err| {
            state.record_login_metric("error");
            ApiError::internal(err)
        })?),
        Ok(None) => None,
        Err(err) => {
            state.record_login_metric("error");
            return Err(ApiError::internal(err));
        }
    };

    let passwords = state.passwords.clone();
    let stored_hash = record.map(|record| record.password_hash);
    let verified =
        tokio::task::spawn_blocking(move || passwords.verify(&password, stored_hash.as_deref()))
            .await
            .map_err(ApiError::internal)?;

    if !verified {
        warn!(%username, "login rejected");
        state.record_login_metric("invalid_credentials");
        return Err(ApiError::Unauthorized {
            code: "invalid_credentials",
        });
    }

    let ttl = state.config.token_ttl_seconds;
    let token = state.tokens.issue_token(&username, ttl).map_err(|err| {
        state.record_login_metric("error");
        ApiError::internal(err)
    })?;

    state.record_login_metric("success");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: ttl,
    }))
}
