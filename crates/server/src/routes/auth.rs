use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use service::auth::{domain::{AuthUser, LoginInput, Principal}, AuthError};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::ServerState;
use crate::errors::ApiError;
use crate::observability::{LOGIN_FAILED_TOTAL, LOGIN_TOTAL};

#[derive(Serialize, ToSchema)]
pub struct LoginSuccess { pub access_token: String }

#[derive(Serialize, ToSchema)]
pub struct LoginOutput { pub success: LoginSuccess }

/// Public profile; never includes credentials.
#[derive(Serialize, ToSchema)]
pub struct UserProfile { pub id: Uuid, pub email: String, pub name: String, pub created_at: DateTime<Utc> }

impl From<AuthUser> for UserProfile {
    fn from(u: AuthUser) -> Self {
        Self { id: u.id, email: u.email, name: u.name, created_at: u.created_at }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserOutput { pub user: UserProfile, pub message: String }

#[derive(Serialize, ToSchema)]
pub struct MessageOutput { pub message: String }

#[utoipa::path(post, path = "/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In", body = LoginOutput), (status = 400, description = "Bad Request"), (status = 401, description = "Unauthorised")))]
pub async fn login(
    State(state): State<ServerState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<LoginOutput>, ApiError> {
    // Malformed bodies are validation failures, not 415/422 framework rejections
    let Json(input) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    LOGIN_TOTAL.inc();
    match state.auth.login(input).await {
        Ok(session) => Ok(Json(LoginOutput { success: LoginSuccess { access_token: session.token.access_token } })),
        Err(e) => {
            if matches!(e, AuthError::Unauthorized) {
                LOGIN_FAILED_TOTAL.inc();
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(get, path = "/user", tag = "auth", security(("bearer" = [])), responses((status = 200, description = "Current user", body = UserOutput), (status = 401, description = "Unauthenticated")))]
pub async fn user(State(state): State<ServerState>, Extension(principal): Extension<Principal>) -> Json<UserOutput> {
    let user = state.auth.current_user(&principal);
    Json(UserOutput { user: user.into(), message: "success".into() })
}

#[utoipa::path(post, path = "/logout", tag = "auth", security(("bearer" = [])), responses((status = 200, description = "Token revoked", body = MessageOutput), (status = 401, description = "Unauthenticated")))]
pub async fn logout(State(state): State<ServerState>, Extension(principal): Extension<Principal>) -> Result<Json<MessageOutput>, ApiError> {
    state.auth.logout(&principal).await?;
    Ok(Json(MessageOutput { message: "success".into() }))
}
