//! Service layer for the auth gateway.
//! - Business rules for login, token resolution and revocation live in `auth`.
//! - Persistence is behind `auth::repository::AuthRepository`; the sea-orm
//!   implementation reuses entity definitions from the `models` crate.

pub mod auth;
