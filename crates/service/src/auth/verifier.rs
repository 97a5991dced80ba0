//! Credential verification: user lookup plus password check.

use std::sync::Arc;

use argon2::{password_hash::{PasswordHasher, PasswordVerifier, SaltString}, Argon2, PasswordHash};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use tracing::debug;

use super::domain::AuthUser;
use super::errors::AuthError;
use super::repository::AuthRepository;

pub const PASSWORD_ALGORITHM: &str = "argon2";

/// Checks an email/password pair. `Ok(None)` means "not authenticated"
/// without saying whether the email or the password was wrong.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, email: &str, password: &str) -> Result<Option<AuthUser>, AuthError>;
}

/// Hash a plaintext password into a PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

/// Verify a plaintext password against a stored PHC string.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

// Verified against when the user does not exist, so both failure paths cost one argon2 run.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("dummy-password-for-timing").ok());

fn burn_dummy_verification(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// Verifier backed by the hashed passwords in an `AuthRepository`.
pub struct RepositoryVerifier<R: AuthRepository + ?Sized> {
    repo: Arc<R>,
}

impl<R: AuthRepository + ?Sized> RepositoryVerifier<R> {
    pub fn new(repo: Arc<R>) -> Self { Self { repo } }
}

#[async_trait]
impl<R: AuthRepository + ?Sized> CredentialVerifier for RepositoryVerifier<R> {
    async fn verify(&self, email: &str, password: &str) -> Result<Option<AuthUser>, AuthError> {
        let Some(user) = self.repo.find_user_by_email(email).await? else {
            debug!("login for unknown email");
            burn_dummy_verification(password);
            return Ok(None);
        };

        let Some(cred) = self.repo.get_credentials(user.id).await? else {
            debug!(user_id = %user.id, "user has no credentials");
            burn_dummy_verification(password);
            return Ok(None);
        };

        if cred.password_algorithm != PASSWORD_ALGORITHM {
            return Err(AuthError::HashError(format!("unsupported algorithm {}", cred.password_algorithm)));
        }
        if verify_password(password, &cred.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::memory::InMemoryAuthRepository;

    async fn seeded() -> (Arc<InMemoryAuthRepository>, AuthUser) {
        let repo = Arc::new(InMemoryAuthRepository::default());
        let user = repo.create_user("alice@example.com", "Alice").await.unwrap();
        let hash = hash_password("secret123").unwrap();
        repo.upsert_password(user.id, hash, PASSWORD_ALGORITHM.into()).await.unwrap();
        (repo, user)
    }

    #[test]
    fn hash_is_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a).unwrap());
        assert!(verify_password("same", &b).unwrap());
        assert!(!verify_password("other", &a).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(verify_password("x", "not-a-phc-string"), Err(AuthError::HashError(_))));
    }

    #[tokio::test]
    async fn verifies_correct_password() {
        let (repo, user) = seeded().await;
        let verifier = RepositoryVerifier::new(repo);
        let found = verifier.verify("alice@example.com", "secret123").await.unwrap();
        assert_eq!(found, Some(user));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let (repo, _) = seeded().await;
        let verifier = RepositoryVerifier::new(repo);
        assert!(verifier.verify("alice@example.com", "wrong").await.unwrap().is_none());
        assert!(verifier.verify("bob@example.com", "secret123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_without_credentials_is_rejected() {
        let repo = Arc::new(InMemoryAuthRepository::default());
        repo.create_user("nocred@example.com", "No Cred").await.unwrap();
        let verifier = RepositoryVerifier::new(repo);
        assert!(verifier.verify("nocred@example.com", "anything").await.unwrap().is_none());
    }
}
