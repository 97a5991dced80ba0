//! Opaque bearer tokens.
//!
//! A token is `agt_` followed by 32 random bytes in URL-safe base64. Only its
//! hex SHA-256 digest is persisted, so a leaked table cannot be replayed.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use super::domain::{AccessToken, AuthUser, IssuedToken, Principal};
use super::errors::AuthError;
use super::repository::AuthRepository;

pub const TOKEN_PREFIX: &str = "agt_";
const TOKEN_BYTES: usize = 32;

/// Mints, resolves and revokes bearer tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, user: &AuthUser) -> Result<IssuedToken, AuthError>;
    /// `Ok(None)` for unknown, expired, revoked or orphaned tokens.
    async fn resolve(&self, token: &str) -> Result<Option<Principal>, AuthError>;
    async fn revoke(&self, token_id: Uuid) -> Result<bool, AuthError>;
}

pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    format!("{}{}", TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(buf))
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Repository-backed issuer of opaque tokens.
pub struct OpaqueTokenIssuer<R: AuthRepository + ?Sized> {
    repo: Arc<R>,
    name: String,
    ttl: Option<Duration>,
}

impl<R: AuthRepository + ?Sized> OpaqueTokenIssuer<R> {
    /// `ttl = None` issues tokens that never expire.
    pub fn new(repo: Arc<R>, name: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self { repo, name: name.into(), ttl }
    }
}

#[async_trait]
impl<R: AuthRepository + ?Sized> TokenIssuer for OpaqueTokenIssuer<R> {
    async fn issue(&self, user: &AuthUser) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = match self.ttl {
            Some(ttl) => Some(
                now.checked_add_signed(ttl)
                    .ok_or_else(|| AuthError::TokenError(format!("token ttl of {}s overflows the expiry timestamp", ttl.num_seconds())))?,
            ),
            None => None,
        };
        let access_token = generate_token();
        let record = AccessToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: self.name.clone(),
            token_hash: hash_token(&access_token),
            created_at: now,
            expires_at,
            revoked_at: None,
        };
        self.repo.insert_token(&record).await?;
        debug!(user_id = %user.id, token_id = %record.id, "token issued");
        Ok(IssuedToken { access_token, record })
    }

    async fn resolve(&self, token: &str) -> Result<Option<Principal>, AuthError> {
        if !token.starts_with(TOKEN_PREFIX) {
            return Ok(None);
        }
        let Some(record) = self.repo.find_token_by_hash(&hash_token(token)).await? else {
            return Ok(None);
        };
        let now = Utc::now();
        if !record.is_active(now) {
            debug!(token_id = %record.id, "token expired or revoked");
            return Ok(None);
        }
        let Some(user) = self.repo.find_user_by_id(record.user_id).await? else {
            warn!(token_id = %record.id, user_id = %record.user_id, "token owner no longer exists");
            return Ok(None);
        };
        if let Err(e) = self.repo.touch_token(record.id, now).await {
            warn!(token_id = %record.id, error = %e, "failed to record token use");
        }
        Ok(Some(Principal { user, token_id: record.id }))
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, AuthError> {
        self.repo.revoke_token(token_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::memory::InMemoryAuthRepository;
    use std::collections::HashSet;

    async fn setup(ttl: Option<Duration>) -> (Arc<InMemoryAuthRepository>, OpaqueTokenIssuer<InMemoryAuthRepository>, AuthUser) {
        let repo = Arc::new(InMemoryAuthRepository::default());
        let user = repo.create_user("alice@example.com", "Alice").await.unwrap();
        let issuer = OpaqueTokenIssuer::new(repo.clone(), "test", ttl);
        (repo, issuer, user)
    }

    #[test]
    fn generated_tokens_are_prefixed_and_unique() {
        let tokens: HashSet<String> = (0..100).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 100);
        for t in &tokens {
            assert!(t.starts_with(TOKEN_PREFIX));
            assert_eq!(t.len(), TOKEN_PREFIX.len() + 43);
        }
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = hash_token("abc");
        assert_eq!(h, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[tokio::test]
    async fn issued_token_resolves_to_owner() {
        let (repo, issuer, user) = setup(None).await;
        let issued = issuer.issue(&user).await.unwrap();
        assert_eq!(issued.record.name, "test");
        assert!(issued.record.expires_at.is_none());
        assert_ne!(issued.record.token_hash, issued.access_token);

        let principal = issuer.resolve(&issued.access_token).await.unwrap().unwrap();
        assert_eq!(principal.user, user);
        assert_eq!(principal.token_id, issued.record.id);
        assert!(repo.last_used(issued.record.id).await.is_some());
    }

    #[tokio::test]
    async fn ttl_sets_expiry() {
        let (_repo, issuer, user) = setup(Some(Duration::minutes(5))).await;
        let issued = issuer.issue(&user).await.unwrap();
        let exp = issued.record.expires_at.unwrap();
        assert_eq!(exp - issued.record.created_at, Duration::minutes(5));
    }

    #[tokio::test]
    async fn overflowing_ttl_is_an_error() {
        let (repo, issuer, user) = setup(Some(Duration::seconds(1_000_000_000_000_000))).await;
        let err = issuer.issue(&user).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenError(_)));
        assert_eq!(repo.token_count(user.id).await, 0);
    }

    #[tokio::test]
    async fn expired_token_does_not_resolve() {
        let (repo, issuer, user) = setup(None).await;
        let token = generate_token();
        let now = Utc::now();
        repo.insert_token(&AccessToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: "test".into(),
            token_hash: hash_token(&token),
            created_at: now - Duration::hours(2),
            expires_at: Some(now - Duration::hours(1)),
            revoked_at: None,
        })
        .await
        .unwrap();
        assert!(issuer.resolve(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoked_token_does_not_resolve() {
        let (_repo, issuer, user) = setup(None).await;
        let issued = issuer.issue(&user).await.unwrap();
        assert!(issuer.revoke(issued.record.id).await.unwrap());
        assert!(!issuer.revoke(issued.record.id).await.unwrap());
        assert!(issuer.resolve(&issued.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn orphaned_token_does_not_resolve() {
        let (repo, issuer, user) = setup(None).await;
        let issued = issuer.issue(&user).await.unwrap();
        repo.orphan_user(user.id).await;
        assert!(issuer.resolve(&issued.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_does_not_resolve() {
        let (_repo, issuer, _user) = setup(None).await;
        assert!(issuer.resolve("").await.unwrap().is_none());
        assert!(issuer.resolve("not-a-token").await.unwrap().is_none());
        assert!(issuer.resolve(&generate_token()).await.unwrap().is_none());
    }
}
