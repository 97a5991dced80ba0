use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::auth::AuthError;
use tracing::error;

/// Error surfaced to HTTP clients as `{"error": "<message>"}`.
///
/// Internal failures are logged here and reach the client without detail.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Send `WWW-Authenticate: Bearer` with the response.
    pub bearer_challenge: bool,
}

pub const UNAUTHORISED: &str = "Unauthorised";
pub const UNAUTHENTICATED: &str = "Unauthenticated";

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), bearer_challenge: false }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated() -> Self {
        Self { bearer_challenge: true, ..Self::new(StatusCode::UNAUTHORIZED, UNAUTHENTICATED) }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => ApiError::validation(msg),
            AuthError::Conflict => ApiError::new(StatusCode::CONFLICT, "Conflict"),
            AuthError::Unauthorized => ApiError::new(StatusCode::UNAUTHORIZED, UNAUTHORISED),
            AuthError::Unauthenticated => ApiError::unauthenticated(),
            internal => {
                error!(code = internal.code(), error = %internal, "auth request failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let challenge = self.bearer_challenge;
        let mut resp = (self.status, Json(serde_json::json!({"error": self.message}))).into_response();
        if challenge {
            resp.headers_mut().insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_auth_errors_to_status() {
        assert_eq!(ApiError::from(AuthError::Unauthorized).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Unauthorized).message, "Unauthorised");
        assert_eq!(ApiError::from(AuthError::Unauthenticated).message, "Unauthenticated");
        assert_eq!(ApiError::from(AuthError::Validation("email is required".into())).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(AuthError::Conflict).status, StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_hide_details() {
        let e = ApiError::from(AuthError::Repository("connection refused at 10.0.0.5".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.message.contains("10.0.0.5"));
    }

    #[test]
    fn unauthenticated_carries_bearer_challenge() {
        let resp = ApiError::unauthenticated().into_response();
        assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        let resp = ApiError::from(AuthError::Unauthorized).into_response();
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn challenge_follows_error_kind_not_message() {
        let lookalike = ApiError::new(StatusCode::UNAUTHORIZED, UNAUTHENTICATED).into_response();
        assert!(lookalike.headers().get(header::WWW_AUTHENTICATE).is_none());
        assert!(ApiError::from(AuthError::Unauthenticated).bearer_challenge);
    }
}
