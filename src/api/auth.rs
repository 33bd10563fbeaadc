use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    Json,
};
use std::sync::Arc;

use crate::db::{CreateUserRequest, LoginForm, TokenResponse, UserResponse};
use crate::services::Identity;
use crate::AppState;

use super::error::ApiError;
use super::extract::{ApiForm, ApiJson};

/// Token endpoint: exchange form credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(token))
}

/// Register a user; admins only
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.create_user(&caller, req).await?;
    Ok(Json(user))
}

/// The bearer token from the Authorization header
fn extract_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get("Authorization")?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Extractor resolving the bearer token into the calling user
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        Ok(state.auth.resolve_identity(token).await?)
    }
}
