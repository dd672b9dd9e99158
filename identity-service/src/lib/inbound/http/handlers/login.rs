use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::errors::AuthError;
use crate::identity::models::LoginCommand;
use crate::identity::models::LoginOutcome;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let Json(body) = payload?;
    let command = LoginCommand::new(body.username_or_email, body.password)?;

    state
        .auth_service
        .login(command)
        .await
        .map_err(|err| {
            if matches!(err, AuthError::InvalidCredentials) {
                tracing::warn!("Login rejected");
            }
            ApiError::from(err)
        })
        .map(|ref outcome| ApiSuccess::new(StatusCode::OK, outcome.into()))
}

/// HTTP request body for login; the identifier may be a username or an email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    username_or_email: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&LoginOutcome> for LoginResponseData {
    fn from(outcome: &LoginOutcome) -> Self {
        Self {
            access_token: outcome.access_token.clone(),
            token_type: outcome.token_type.to_string(),
            expires_at: outcome.expires_at,
            username: outcome.username.clone(),
            email: outcome.email.clone(),
            role: outcome.role.as_str().to_string(),
        }
    }
}
