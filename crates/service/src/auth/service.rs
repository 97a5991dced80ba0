use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, instrument, warn};

use super::domain::{AuthSession, AuthUser, LoginInput, Principal, RegisterInput};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::token::{OpaqueTokenIssuer, TokenIssuer};
use super::verifier::{hash_password, CredentialVerifier, RepositoryVerifier, PASSWORD_ALGORITHM};

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Label stored on every issued token.
    pub token_name: String,
    /// `None` issues tokens without expiry.
    pub token_ttl: Option<Duration>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { token_name: "auth-gateway".into(), token_ttl: None }
    }
}

/// Auth business service independent of web framework
pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    verifier: Arc<dyn CredentialVerifier>,
    tokens: Arc<dyn TokenIssuer>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    /// Build the service with the repository-backed verifier and opaque token issuer.
    pub fn new(repo: Arc<dyn AuthRepository>, cfg: AuthConfig) -> Self {
        let verifier: Arc<dyn CredentialVerifier> = Arc::new(RepositoryVerifier::new(Arc::clone(&repo)));
        let tokens: Arc<dyn TokenIssuer> = Arc::new(OpaqueTokenIssuer::new(Arc::clone(&repo), cfg.token_name, cfg.token_ttl));
        Self { repo, verifier, tokens }
    }

    /// Build the service from explicit collaborators.
    pub fn with_components(
        repo: Arc<dyn AuthRepository>,
        verifier: Arc<dyn CredentialVerifier>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self { repo, verifier, tokens }
    }

    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::memory::InMemoryAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(InMemoryAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default());
    /// let input = RegisterInput { email: "User@Example.com".into(), name: "Test".into(), password: "Secret123".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        models::user::validate_email(&input.email)?;
        models::user::validate_name(&input.name)?;
        if input.password.len() < 8 {
            return Err(AuthError::Validation("password too short (>=8)".into()));
        }
        let email = normalize_email(&input.email);
        if let Some(existing) = self.repo.find_user_by_email(&email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let hash = hash_password(&input.password)?;
        let user = self
            .repo
            .create_user_with_password(&email, input.name.trim(), hash, PASSWORD_ALGORITHM.into())
            .await?;
        info!(user_id = %user.id, email = %user.email, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a new bearer token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::memory::InMemoryAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(InMemoryAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default());
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(session.token.access_token.starts_with("agt_"));
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        if input.email.trim().is_empty() {
            return Err(AuthError::Validation("email is required".into()));
        }
        if input.password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }

        let email = normalize_email(&input.email);
        let Some(user) = self.verifier.verify(&email, &input.password).await? else {
            warn!("login_failed");
            return Err(AuthError::Unauthorized);
        };

        let token = self.tokens.issue(&user).await?;
        info!(user_id = %user.id, token_id = %token.record.id, "login_succeeded");
        Ok(AuthSession { user, token })
    }

    /// Resolve a bearer token into the principal that owns it.
    pub async fn authenticate(&self, bearer: &str) -> Result<Principal, AuthError> {
        match self.tokens.resolve(bearer).await? {
            Some(principal) => Ok(principal),
            None => Err(AuthError::Unauthenticated),
        }
    }

    /// Profile of the authenticated caller.
    pub fn current_user(&self, principal: &Principal) -> AuthUser {
        principal.user.clone()
    }

    /// Revoke the token the principal authenticated with; the user's other tokens stay valid.
    #[instrument(skip(self, principal), fields(user_id = %principal.user.id, token_id = %principal.token_id))]
    pub async fn logout(&self, principal: &Principal) -> Result<(), AuthError> {
        if !self.tokens.revoke(principal.token_id).await? {
            return Err(AuthError::Unauthenticated);
        }
        info!("token_revoked");
        Ok(())
    }
}
