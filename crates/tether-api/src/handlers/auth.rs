//! Login: trades credentials for a one-time admission token.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::info;

use tether_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /login`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login: the token to present on `/ws?otp=`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub otp: String,
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body.map_err(|e| AppError::validation(e.body_text()))?;

    if !state.verifier.verify(&req.username, &req.password).await? {
        info!(username = %req.username, "Login rejected");
        return Err(AppError::unauthorized("Invalid username or password").into());
    }

    let token = state.engine.tokens.issue();
    info!(username = %req.username, "Issued admission token");

    Ok(Json(LoginResponse { otp: token.key }))
}
