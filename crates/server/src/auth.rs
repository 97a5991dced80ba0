use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use service::auth::AuthService;
use tracing::warn;

use crate::errors::ApiError;
use crate::observability::TOKEN_REJECTED_TOTAL;

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService>,
}

impl ServerState {
    pub fn new(auth: AuthService) -> Self {
        Self { auth: Arc::new(auth) }
    }
}

/// Extract the token from `Authorization: Bearer <token>`. The scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the bearer token into a `Principal` and hand it to the handler
/// through request extensions. Any failure is 401 `Unauthenticated`.
pub async fn require_bearer_token(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_owned();

    let Some(token) = bearer_token(req.headers()).map(str::to_owned) else {
        warn!(path = %path, "missing or malformed Authorization header");
        TOKEN_REJECTED_TOTAL.inc();
        return Err(ApiError::unauthenticated());
    };

    match state.auth.authenticate(&token).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        Err(e) => {
            warn!(path = %path, code = e.code(), "token validation failed");
            TOKEN_REJECTED_TOTAL.inc();
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&headers("Bearer agt_abc")), Some("agt_abc"));
        assert_eq!(bearer_token(&headers("bearer   agt_abc ")), Some("agt_abc"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer    ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
