use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::error;
use uuid::Uuid;

use super::domain::{AccessToken, AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
///
/// Emails passed in are already normalised (trimmed, lower-case).
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, email: &str, name: &str) -> Result<AuthUser, AuthError>;
    /// Remove a user; credentials and tokens go with it.
    async fn delete_user(&self, id: Uuid) -> Result<(), AuthError>;

    /// Create a user together with its password; on failure neither is left behind.
    ///
    /// The default writes the user first and deletes it again when the password
    /// cannot be stored. Transactional stores should override this.
    async fn create_user_with_password(
        &self,
        email: &str,
        name: &str,
        password_hash: String,
        password_algorithm: String,
    ) -> Result<AuthUser, AuthError> {
        let user = self.create_user(email, name).await?;
        if let Err(e) = self.upsert_password(user.id, password_hash, password_algorithm).await {
            if let Err(cleanup) = self.delete_user(user.id).await {
                error!(user_id = %user.id, error = %cleanup, "failed to remove user after credential write failed");
            }
            return Err(e);
        }
        Ok(user)
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;

    async fn insert_token(&self, token: &AccessToken) -> Result<(), AuthError>;
    async fn find_token_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>, AuthError>;
    /// Returns false when the token was unknown or already revoked.
    async fn revoke_token(&self, token_id: Uuid) -> Result<bool, AuthError>;
    async fn touch_token(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;
}

/// In-memory repository for tests and database-less local runs
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub struct InMemoryAuthRepository {
        users: RwLock<HashMap<String, AuthUser>>,           // key: normalised email
        creds: RwLock<HashMap<Uuid, Credentials>>,          // key: user_id
        tokens: RwLock<HashMap<String, AccessToken>>,       // key: token_hash
        last_used: RwLock<HashMap<Uuid, DateTime<Utc>>>,    // key: token id
    }

    impl InMemoryAuthRepository {
        /// Drop a user together with credentials and tokens, like the FK cascade does.
        pub async fn remove_user(&self, user_id: Uuid) {
            self.users.write().await.retain(|_, u| u.id != user_id);
            self.creds.write().await.remove(&user_id);
            let mut tokens = self.tokens.write().await;
            let mut last_used = self.last_used.write().await;
            tokens.retain(|_, t| {
                if t.user_id == user_id {
                    last_used.remove(&t.id);
                    false
                } else {
                    true
                }
            });
        }

        pub async fn last_used_count(&self) -> usize {
            self.last_used.read().await.len()
        }

        /// Drop a user but leave its tokens behind.
        pub async fn orphan_user(&self, user_id: Uuid) {
            self.users.write().await.retain(|_, u| u.id != user_id);
        }

        pub async fn token_count(&self, user_id: Uuid) -> usize {
            self.tokens.read().await.values().filter(|t| t.user_id == user_id).count()
        }

        pub async fn last_used(&self, token_id: Uuid) -> Option<DateTime<Utc>> {
            self.last_used.read().await.get(&token_id).copied()
        }
    }

    #[async_trait]
    impl AuthRepository for InMemoryAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.read().await.get(email).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.read().await.values().find(|u| u.id == id).cloned())
        }

        async fn create_user(&self, email: &str, name: &str) -> Result<AuthUser, AuthError> {
            let mut users = self.users.write().await;
            if users.contains_key(email) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser { id: Uuid::new_v4(), email: email.to_string(), name: name.to_string(), created_at: Utc::now() };
            users.insert(email.to_string(), user.clone());
            Ok(user)
        }

        async fn delete_user(&self, id: Uuid) -> Result<(), AuthError> {
            self.remove_user(id).await;
            Ok(())
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            Ok(self.creds.read().await.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let c = Credentials { user_id, password_hash, password_algorithm };
            self.creds.write().await.insert(user_id, c.clone());
            Ok(c)
        }

        async fn insert_token(&self, token: &AccessToken) -> Result<(), AuthError> {
            let mut tokens = self.tokens.write().await;
            if tokens.contains_key(&token.token_hash) {
                return Err(AuthError::Repository("duplicate token hash".into()));
            }
            tokens.insert(token.token_hash.clone(), token.clone());
            Ok(())
        }

        async fn find_token_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>, AuthError> {
            Ok(self.tokens.read().await.get(token_hash).cloned())
        }

        async fn revoke_token(&self, token_id: Uuid) -> Result<bool, AuthError> {
            let mut tokens = self.tokens.write().await;
            match tokens.values_mut().find(|t| t.id == token_id && t.revoked_at.is_none()) {
                Some(t) => {
                    t.revoked_at = Some(Utc::now());
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn touch_token(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
            self.last_used.write().await.insert(token_id, at);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryAuthRepository;
    use super::*;

    #[tokio::test]
    async fn remove_user_drops_token_usage() {
        let repo = InMemoryAuthRepository::default();
        let alice = repo.create_user("alice@example.com", "Alice").await.unwrap();
        let bob = repo.create_user("bob@example.com", "Bob").await.unwrap();
        let now = Utc::now();
        for (i, owner) in [alice.id, alice.id, bob.id].into_iter().enumerate() {
            let token = AccessToken {
                id: Uuid::new_v4(),
                user_id: owner,
                name: "test".into(),
                token_hash: format!("{:064}", i),
                created_at: now,
                expires_at: None,
                revoked_at: None,
            };
            repo.insert_token(&token).await.unwrap();
            repo.touch_token(token.id, now).await.unwrap();
        }
        assert_eq!(repo.last_used_count().await, 3);

        repo.delete_user(alice.id).await.unwrap();
        assert_eq!(repo.token_count(alice.id).await, 0);
        assert_eq!(repo.token_count(bob.id).await, 1);
        assert_eq!(repo.last_used_count().await, 1);
        assert!(repo.get_credentials(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_user_with_password_stores_both() {
        let repo = InMemoryAuthRepository::default();
        let user = repo
            .create_user_with_password("carol@example.com", "Carol", "hash".into(), "argon2".into())
            .await
            .unwrap();
        let creds = repo.get_credentials(user.id).await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "hash");
    }
}
