//! `/api/auth/token` handlers.

use crate::{
    api::{
        AppState,
        extract::{CurrentUser, Payload},
    },
    core::auth,
    errors::Result,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Payload(request): Payload<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let auth_token = auth::login(&state.db, &request.email, &request.password).await?;
    Ok(Json(TokenResponse { auth_token }))
}

/// Revokes only the token the request was made with.
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> Result<StatusCode> {
    auth::revoke_token(&state.db, &current.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
