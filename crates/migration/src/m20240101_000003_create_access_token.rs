//! Create `access_token` table.
//!
//! Only the SHA-256 digest of a bearer token is stored; the unique key on
//! `token_hash` rejects any collision at the storage layer.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessToken::Table)
                    .if_not_exists()
                    .col(uuid(AccessToken::Id).primary_key())
                    .col(uuid(AccessToken::UserId).not_null())
                    .col(string_len(AccessToken::Name, 128).not_null())
                    .col(string_len(AccessToken::TokenHash, 64).unique_key().not_null())
                    .col(timestamp_with_time_zone(AccessToken::CreatedAt).not_null())
                    // Nullable timestamps: no expiry, not revoked, never used
                    .col(ColumnDef::new(AccessToken::ExpiresAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(AccessToken::RevokedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(AccessToken::LastUsedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_token_user")
                            .from(AccessToken::Table, AccessToken::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AccessToken::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum AccessToken { Table, Id, UserId, Name, TokenHash, CreatedAt, ExpiresAt, RevokedAt, LastUsedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
