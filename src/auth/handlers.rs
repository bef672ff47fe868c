//! REST auth handlers

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::Result;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::UserInfo;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
}

/// PUT /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    info!("PUT /auth/signup - {}", req.email);

    let user = state
        .auth
        .signup(&req.email, &req.name, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created".to_string(),
            user_id: user.id,
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    info!("POST /auth/login - {}", req.email);

    let outcome = state.auth.login(&req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        user_id: outcome.user_id,
    }))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, ctx: Ctx) -> Result<Json<UserInfo>> {
    // The token may outlive the user record; fail closed if it is gone.
    let user = state.auth.get_user(ctx.user_id()).await?;
    Ok(Json(user))
}
