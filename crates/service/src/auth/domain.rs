use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registration input
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Login input. Missing fields deserialize as empty and fail validation.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Domain user (business view). Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Domain credentials (hashed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Persisted record of an issued bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Unrevoked and not past its expiry (if any) at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.revoked_at.is_some() {
            return false;
        }
        match self.expires_at {
            Some(exp) => now < exp,
            None => true,
        }
    }
}

/// A freshly minted token: the plaintext bearer string plus its stored record.
/// The plaintext exists only here and in the login response.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub record: AccessToken,
}

/// Identity resolved from a valid bearer token, handed explicitly to
/// every authenticated operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user: AuthUser,
    pub token_id: Uuid,
}

/// Login result (session)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: IssuedToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_at: Option<DateTime<Utc>>, revoked_at: Option<DateTime<Utc>>) -> AccessToken {
        AccessToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "test".into(),
            token_hash: "0".repeat(64),
            created_at: Utc::now(),
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn token_without_expiry_stays_active() {
        assert!(token(None, None).is_active(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn token_expires_at_boundary() {
        let now = Utc::now();
        let t = token(Some(now), None);
        assert!(t.is_active(now - Duration::seconds(1)));
        assert!(!t.is_active(now));
    }

    #[test]
    fn revoked_token_is_inactive() {
        assert!(!token(None, Some(Utc::now())).is_active(Utc::now()));
    }

    #[test]
    fn debug_output_redacts_password() {
        let input = LoginInput { email: "a@b.com".into(), password: "hunter22".into() };
        let out = format!("{:?}", input);
        assert!(out.contains("a@b.com"));
        assert!(!out.contains("hunter22"));
    }

    #[test]
    fn login_input_missing_fields_default_to_empty() {
        let input: LoginInput = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(input.email, "a@b.com");
        assert!(input.password.is_empty());
    }
}
