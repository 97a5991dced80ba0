//! Issued bearer tokens. Rows hold the SHA-256 digest only; the plaintext
//! token is returned to the client once and never stored.
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub revoked_at: Option<DateTimeWithTimeZone>,
    pub last_used_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct NewAccessToken<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: &'a str,
    pub token_hash: &'a str,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: Option<DateTimeWithTimeZone>,
}

pub async fn create(db: &DatabaseConnection, new: NewAccessToken<'_>) -> Result<Model, ModelError> {
    if new.token_hash.len() != 64 {
        return Err(ModelError::Validation("token_hash must be a hex sha256 digest".into()));
    }
    let am = ActiveModel {
        id: Set(new.id),
        user_id: Set(new.user_id),
        name: Set(new.name.to_string()),
        token_hash: Set(new.token_hash.to_string()),
        created_at: Set(new.created_at),
        expires_at: Set(new.expires_at),
        revoked_at: Set(None),
        last_used_at: Set(None),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn find_by_hash(db: &DatabaseConnection, token_hash: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::TokenHash.eq(token_hash))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}

/// Mark a token revoked. Returns false when it was unknown or already revoked.
pub async fn revoke(db: &DatabaseConnection, id: Uuid) -> Result<bool, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::RevokedAt, Expr::value(Some(DateTimeWithTimeZone::from(Utc::now()))))
        .filter(Column::Id.eq(id))
        .filter(Column::RevokedAt.is_null())
        .exec(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(res.rows_affected > 0)
}

pub async fn touch(db: &DatabaseConnection, id: Uuid, at: DateTimeWithTimeZone) -> Result<(), ModelError> {
    Entity::update_many()
        .col_expr(Column::LastUsedAt, Expr::value(Some(at)))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(())
}
