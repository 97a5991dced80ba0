use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use uuid::Uuid;

use models::access_token::NewAccessToken;

use crate::auth::domain::{AccessToken, AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn to_user(u: models::user::Model) -> AuthUser {
    AuthUser { id: u.id, email: u.email, name: u.name, created_at: u.created_at.with_timezone(&Utc) }
}

fn to_token(t: models::access_token::Model) -> AccessToken {
    AccessToken {
        id: t.id,
        user_id: t.user_id,
        name: t.name,
        token_hash: t.token_hash,
        created_at: t.created_at.with_timezone(&Utc),
        expires_at: t.expires_at.map(|d| d.with_timezone(&Utc)),
        revoked_at: t.revoked_at.map(|d| d.with_timezone(&Utc)),
    }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email).await?;
        Ok(res.map(to_user))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_user))
    }

    async fn create_user(&self, email: &str, name: &str) -> Result<AuthUser, AuthError> {
        if models::user::find_by_email(&self.db, email).await?.is_some() {
            return Err(AuthError::Conflict);
        }
        let created = models::user::create(&self.db, email, name).await?;
        Ok(to_user(created))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AuthError> {
        Ok(models::user::hard_delete(&self.db, id).await?)
    }

    async fn create_user_with_password(
        &self,
        email: &str,
        name: &str,
        password_hash: String,
        password_algorithm: String,
    ) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        let created = models::user::create(&txn, email, name).await?;
        models::user_credentials::upsert_password(&txn, created.id, password_hash, &password_algorithm).await?;
        txn.commit().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(to_user(created))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::find_by_user(&self.db, user_id).await?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = models::user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm).await?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }

    async fn insert_token(&self, token: &AccessToken) -> Result<(), AuthError> {
        models::access_token::create(
            &self.db,
            NewAccessToken {
                id: token.id,
                user_id: token.user_id,
                name: &token.name,
                token_hash: &token.token_hash,
                created_at: token.created_at.into(),
                expires_at: token.expires_at.map(Into::into),
            },
        )
        .await
        .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn find_token_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>, AuthError> {
        let res = models::access_token::find_by_hash(&self.db, token_hash).await?;
        Ok(res.map(to_token))
    }

    async fn revoke_token(&self, token_id: Uuid) -> Result<bool, AuthError> {
        Ok(models::access_token::revoke(&self.db, token_id).await?)
    }

    async fn touch_token(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        Ok(models::access_token::touch(&self.db, token_id, at.into()).await?)
    }
}
