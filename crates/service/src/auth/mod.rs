//! Auth module: layered as domain, repository, verifier/token collaborators and service.
//!
//! `AuthService` is the only entry point the HTTP layer needs.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod repo;
pub mod service;
pub mod token;
pub mod verifier;

pub use errors::AuthError;
pub use service::AuthService;
