use async_trait::async_trait;

use crate::identity::errors::AuthError;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::IssuedToken;
use crate::identity::models::LoginCommand;
use crate::identity::models::LoginOutcome;
use crate::identity::models::Principal;
use crate::identity::models::RegisterCommand;
use crate::identity::models::Role;
use crate::identity::models::Username;

/// Port for authentication service operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new identity.
    ///
    /// # Arguments
    /// * `command` - Validated username and email plus the chosen password
    ///
    /// # Returns
    /// The stored identity (no token is issued on registration)
    ///
    /// # Errors
    /// * `UniquenessViolation` - Username or email is already taken
    /// * `InvalidPassword` - Password does not meet the policy
    /// * `Hashing` / `Database` - Infrastructure failure
    async fn register(&self, command: RegisterCommand) -> Result<Identity, AuthError>;

    /// Authenticate with a username or email and issue a token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown identifier, inactive identity or wrong password
    /// * `InternalConsistency` - Authenticated principal vanished from the store
    /// * `Hashing` / `TokenIssuance` / `Database` - Infrastructure failure
    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError>;

    /// Validate a bearer token and return the caller it asserts.
    ///
    /// # Errors
    /// * `InvalidToken` - Signature, issuer, expiry or claims are not acceptable
    async fn resolve_principal(&self, token: &str) -> Result<Principal, AuthError>;

    /// Load the identity behind `principal`.
    ///
    /// # Errors
    /// * `NotFound` - No identity with the principal's username
    /// * `Database` - Database operation failed
    async fn current_profile(&self, principal: &Principal) -> Result<Identity, AuthError>;
}

/// Persistence operations for the identity aggregate.
///
/// Implementations must enforce username and email uniqueness themselves:
/// `create` is the only write path and has to reject a duplicate even when a
/// concurrent caller passed the same pre-checks.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Insert a new identity.
    ///
    /// # Errors
    /// * `UniquenessViolation` - Username or email is already stored
    /// * `Database` - Database operation failed
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError>;

    /// Retrieve identity by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError>;

    /// Retrieve the identity whose username or email equals `identifier`.
    ///
    /// A username match wins over an email match.
    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<Identity>, AuthError>;

    async fn exists_by_username(&self, username: &Username) -> Result<bool, AuthError>;

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, AuthError>;
}

/// One-way salted password hashing.
///
/// Both calls are CPU-bound; the service runs them off the async executor.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash `password`; two calls with the same input return different values.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Check `password` against a stored hash without recovering the original.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Issues and validates signed, time-bounded identity tokens.
pub trait TokenIssuer: Send + Sync + 'static {
    /// Sign a token with subject `username` and the given role claim.
    fn issue(&self, username: &str, role: Role) -> Result<IssuedToken, AuthError>;

    /// Verify a token and return the principal it asserts.
    fn validate(&self, token: &str) -> Result<Principal, AuthError>;
}
