use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;

use crate::identity::errors::AuthError;
use crate::identity::errors::UniqueField;
use crate::identity::models::Identity;
use crate::identity::models::LoginCommand;
use crate::identity::models::LoginOutcome;
use crate::identity::models::Password;
use crate::identity::models::Principal;
use crate::identity::models::RegisterCommand;
use crate::identity::models::BEARER;
use crate::identity::ports::AuthServicePort;
use crate::identity::ports::IdentityRepository;
use crate::identity::ports::PasswordHasher;
use crate::identity::ports::TokenIssuer;

/// Verified against when the login identifier matches nobody, so an unknown
/// account costs as much as a wrong password.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-identities";

/// Domain service implementation for registration and login.
///
/// Collaborators are injected at construction so tests can substitute them.
pub struct AuthService<IR, PH, TI>
where
    IR: IdentityRepository,
    PH: PasswordHasher,
    TI: TokenIssuer,
{
    repository: Arc<IR>,
    password_hasher: Arc<PH>,
    token_issuer: Arc<TI>,
    decoy_hash: OnceCell<String>,
}

impl<IR, PH, TI> AuthService<IR, PH, TI>
where
    IR: IdentityRepository,
    PH: PasswordHasher,
    TI: TokenIssuer,
{
    /// Create a new authentication service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Identity persistence implementation
    /// * `password_hasher` - One-way password hashing implementation
    /// * `token_issuer` - Token signing and validation implementation
    pub fn new(repository: Arc<IR>, password_hasher: Arc<PH>, token_issuer: Arc<TI>) -> Self {
        Self {
            repository,
            password_hasher,
            token_issuer,
            decoy_hash: OnceCell::new(),
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.password_hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.password_hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    async fn decoy_hash(&self) -> Result<String, AuthError> {
        self.decoy_hash
            .get_or_try_init(|| self.hash_password(DECOY_PASSWORD.to_string()))
            .await
            .cloned()
    }

    /// Check the identifier/password pair and return who it belongs to.
    ///
    /// Every failure is the same `InvalidCredentials`, whichever half was wrong.
    async fn authenticate(&self, command: LoginCommand) -> Result<Principal, AuthError> {
        let LoginCommand {
            identifier,
            password,
        } = command;

        let Some(identity) = self
            .repository
            .find_by_username_or_email(&identifier)
            .await?
        else {
            let decoy = self.decoy_hash().await?;
            self.verify_password(password, decoy).await?;
            return Err(AuthError::InvalidCredentials);
        };

        let matches = self
            .verify_password(password, identity.password_hash)
            .await?;
        if !matches || !identity.active {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Principal {
            username: identity.username.as_str().to_string(),
            role: identity.role,
        })
    }
}

#[async_trait]
impl<IR, PH, TI> AuthServicePort for AuthService<IR, PH, TI>
where
    IR: IdentityRepository,
    PH: PasswordHasher,
    TI: TokenIssuer,
{
    async fn register(&self, command: RegisterCommand) -> Result<Identity, AuthError> {
        if self
            .repository
            .exists_by_username(&command.username)
            .await?
        {
            return Err(AuthError::UniquenessViolation(UniqueField::Username));
        }

        if self.repository.exists_by_email(&command.email).await? {
            return Err(AuthError::UniquenessViolation(UniqueField::Email));
        }

        let password = Password::new(command.password)?;
        let password_hash = self.hash_password(password.into_inner()).await?;

        let identity = Identity::register(command.username, command.email, password_hash, Utc::now());

        // The pre-checks above are advisory; the store has the final word when
        // two registrations for the same name race.
        let created = self.repository.create(identity).await?;

        tracing::info!(
            identity_id = %created.id,
            username = %created.username,
            "Identity registered"
        );

        Ok(created)
    }

    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError> {
        let principal = self.authenticate(command).await?;

        let issued = self
            .token_issuer
            .issue(&principal.username, principal.role)?;

        let identity = self
            .repository
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| {
                tracing::error!(
                    username = %principal.username,
                    "Authenticated principal missing from identity store"
                );
                AuthError::InternalConsistency(format!(
                    "authenticated principal {} not found",
                    principal.username
                ))
            })?;

        Ok(LoginOutcome {
            access_token: issued.token,
            token_type: BEARER,
            expires_at: issued.expires_at,
            username: identity.username.as_str().to_string(),
            email: identity.email.as_str().to_string(),
            role: identity.role,
        })
    }

    async fn resolve_principal(&self, token: &str) -> Result<Principal, AuthError> {
        self.token_issuer.validate(token)
    }

    async fn current_profile(&self, principal: &Principal) -> Result<Identity, AuthError> {
        self.repository
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| AuthError::NotFound(principal.username.clone()))
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;

    use super::*;
    use crate::identity::models::EmailAddress;
    use crate::identity::models::IssuedToken;
    use crate::identity::models::Role;
    use crate::identity::models::Username;

    mock! {
        pub TestIdentityRepository {}

        #[async_trait]
        impl IdentityRepository for TestIdentityRepository {
            async fn create(&self, identity: Identity) -> Result<Identity, AuthError>;
            async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError>;
            async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<Identity>, AuthError>;
            async fn exists_by_username(&self, username: &Username) -> Result<bool, AuthError>;
            async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, AuthError>;
        }
    }

    mock! {
        pub TestPasswordHasher {}

        impl PasswordHasher for TestPasswordHasher {
            fn hash(&self, password: &str) -> Result<String, AuthError>;
            fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
        }
    }

    mock! {
        pub TestTokenIssuer {}

        impl TokenIssuer for TestTokenIssuer {
            fn issue(&self, username: &str, role: Role) -> Result<IssuedToken, AuthError>;
            fn validate(&self, token: &str) -> Result<Principal, AuthError>;
        }
    }

    fn service(
        repository: MockTestIdentityRepository,
        hasher: MockTestPasswordHasher,
        issuer: MockTestTokenIssuer,
    ) -> AuthService<MockTestIdentityRepository, MockTestPasswordHasher, MockTestTokenIssuer> {
        AuthService::new(Arc::new(repository), Arc::new(hasher), Arc::new(issuer))
    }

    fn alice() -> Identity {
        Identity::register(
            Username::new("alice".to_string()).unwrap(),
            EmailAddress::new("alice@example.com".to_string()).unwrap(),
            "$argon2id$stored_hash".to_string(),
            Utc::now(),
        )
    }

    fn register_command(username: &str, email: &str, password: &str) -> RegisterCommand {
        RegisterCommand::new(
            Username::new(username.to_string()).unwrap(),
            EmailAddress::new(email.to_string()).unwrap(),
            password.to_string(),
        )
    }

    fn login_command(identifier: &str, password: &str) -> LoginCommand {
        LoginCommand::new(identifier.to_string(), password.to_string()).unwrap()
    }

    fn issued(token: &str) -> IssuedToken {
        IssuedToken {
            token: token.to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        repository
            .expect_exists_by_username()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_exists_by_email()
            .times(1)
            .returning(|_| Ok(false));
        hasher
            .expect_hash()
            .withf(|password| password == "secret12")
            .times(1)
            .returning(|_| Ok("$argon2id$fresh_hash".to_string()));
        repository
            .expect_create()
            .withf(|identity| {
                identity.username.as_str() == "alice"
                    && identity.email.as_str() == "alice@example.com"
                    && identity.password_hash == "$argon2id$fresh_hash"
                    && identity.role == Role::User
                    && identity.active
            })
            .times(1)
            .returning(Ok);

        let service = service(repository, hasher, MockTestTokenIssuer::new());

        let identity = service
            .register(register_command("alice", "alice@example.com", "secret12"))
            .await
            .expect("registration failed");

        assert_eq!(identity.username.as_str(), "alice");
        assert_ne!(identity.password_hash, "secret12");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_skips_email_check_and_insert() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        repository
            .expect_exists_by_username()
            .times(1)
            .returning(|_| Ok(true));
        repository.expect_exists_by_email().times(0);
        repository.expect_create().times(0);
        hasher.expect_hash().times(0);

        let service = service(repository, hasher, MockTestTokenIssuer::new());

        let result = service
            .register(register_command("alice", "alice@example.com", "secret12"))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::UniquenessViolation(UniqueField::Username))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut repository = MockTestIdentityRepository::new();

        repository
            .expect_exists_by_username()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_exists_by_email()
            .times(1)
            .returning(|_| Ok(true));
        repository.expect_create().times(0);

        let service = service(
            repository,
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        let result = service
            .register(register_command("bob", "alice@example.com", "secret12"))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::UniquenessViolation(UniqueField::Email))
        ));
    }

    #[tokio::test]
    async fn test_register_taken_username_reported_before_password_policy() {
        let mut repository = MockTestIdentityRepository::new();

        repository
            .expect_exists_by_username()
            .times(1)
            .returning(|_| Ok(true));

        let service = service(
            repository,
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        let result = service
            .register(register_command("alice", "other@example.com", "x"))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::UniquenessViolation(UniqueField::Username))
        ));
    }

    #[tokio::test]
    async fn test_register_short_password_writes_nothing() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        repository
            .expect_exists_by_username()
            .returning(|_| Ok(false));
        repository.expect_exists_by_email().returning(|_| Ok(false));
        repository.expect_create().times(0);
        hasher.expect_hash().times(0);

        let service = service(repository, hasher, MockTestTokenIssuer::new());

        let result = service
            .register(register_command("alice", "alice@example.com", "short"))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidPassword(_))));
    }

    #[tokio::test]
    async fn test_register_lost_race_surfaces_uniqueness_violation() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        repository
            .expect_exists_by_username()
            .returning(|_| Ok(false));
        repository.expect_exists_by_email().returning(|_| Ok(false));
        hasher
            .expect_hash()
            .returning(|_| Ok("$argon2id$fresh_hash".to_string()));
        repository
            .expect_create()
            .times(1)
            .returning(|_| Err(AuthError::UniquenessViolation(UniqueField::Username)));

        let service = service(repository, hasher, MockTestTokenIssuer::new());

        let result = service
            .register(register_command("alice", "alice@example.com", "secret12"))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::UniquenessViolation(UniqueField::Username))
        ));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        let stored = alice();
        let found = stored.clone();
        repository
            .expect_find_by_username_or_email()
            .withf(|identifier| identifier == "alice@example.com")
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));
        hasher
            .expect_verify()
            .withf(|password, hash| password == "secret12" && hash == "$argon2id$stored_hash")
            .times(1)
            .returning(|_, _| Ok(true));
        issuer
            .expect_issue()
            .withf(|username, role| username == "alice" && *role == Role::User)
            .times(1)
            .returning(|_, _| Ok(issued("signed.token.value")));
        repository
            .expect_find_by_username()
            .withf(|username| username == "alice")
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));

        let service = service(repository, hasher, issuer);

        let outcome = service
            .login(login_command("alice@example.com", "secret12"))
            .await
            .expect("login failed");

        assert_eq!(outcome.access_token, "signed.token.value");
        assert_eq!(outcome.token_type, "Bearer");
        assert_eq!(outcome.username, "alice");
        assert_eq!(outcome.email, "alice@example.com");
        assert_eq!(outcome.role, Role::User);
    }

    #[tokio::test]
    async fn test_login_wrong_password_issues_no_token() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        repository
            .expect_find_by_username_or_email()
            .returning(|_| Ok(Some(alice())));
        hasher.expect_verify().times(1).returning(|_, _| Ok(false));
        issuer.expect_issue().times(0);

        let service = service(repository, hasher, issuer);

        let result = service.login(login_command("alice", "wrong")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_identifier_still_verifies_a_hash() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        repository
            .expect_find_by_username_or_email()
            .times(2)
            .returning(|_| Ok(None));
        // The decoy hash is computed once and reused.
        hasher
            .expect_hash()
            .withf(|password| password == DECOY_PASSWORD)
            .times(1)
            .returning(|_| Ok("$argon2id$decoy".to_string()));
        hasher
            .expect_verify()
            .withf(|_, hash| hash == "$argon2id$decoy")
            .times(2)
            .returning(|_, _| Ok(false));
        issuer.expect_issue().times(0);

        let service = service(repository, hasher, issuer);

        for _ in 0..2 {
            let result = service.login(login_command("nobody", "secret12")).await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn test_login_inactive_identity_is_rejected() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        repository.expect_find_by_username_or_email().returning(|_| {
            let mut identity = alice();
            identity.active = false;
            Ok(Some(identity))
        });
        hasher.expect_verify().returning(|_, _| Ok(true));
        issuer.expect_issue().times(0);

        let service = service(repository, hasher, issuer);

        let result = service.login(login_command("alice", "secret12")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_principal_missing_after_authentication() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        repository
            .expect_find_by_username_or_email()
            .returning(|_| Ok(Some(alice())));
        hasher.expect_verify().returning(|_, _| Ok(true));
        issuer
            .expect_issue()
            .returning(|_, _| Ok(issued("signed.token.value")));
        repository
            .expect_find_by_username()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(repository, hasher, issuer);

        let result = service.login(login_command("alice", "secret12")).await;
        assert!(matches!(result, Err(AuthError::InternalConsistency(_))));
    }

    #[tokio::test]
    async fn test_login_malformed_stored_hash_is_not_a_credential_failure() {
        let mut repository = MockTestIdentityRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        repository
            .expect_find_by_username_or_email()
            .returning(|_| Ok(Some(alice())));
        hasher
            .expect_verify()
            .returning(|_, _| Err(AuthError::Hashing("Invalid password hash".to_string())));

        let service = service(repository, hasher, MockTestTokenIssuer::new());

        let result = service.login(login_command("alice", "secret12")).await;
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[tokio::test]
    async fn test_resolve_principal_delegates_to_issuer() {
        let mut issuer = MockTestTokenIssuer::new();
        issuer
            .expect_validate()
            .withf(|token| token == "good.token")
            .returning(|_| {
                Ok(Principal {
                    username: "alice".to_string(),
                    role: Role::Moderator,
                })
            });
        issuer
            .expect_validate()
            .withf(|token| token == "bad.token")
            .returning(|_| Err(AuthError::InvalidToken("Token is expired".to_string())));

        let service = service(
            MockTestIdentityRepository::new(),
            MockTestPasswordHasher::new(),
            issuer,
        );

        let principal = service.resolve_principal("good.token").await.unwrap();
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, Role::Moderator);

        assert!(matches!(
            service.resolve_principal("bad.token").await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_current_profile() {
        let mut repository = MockTestIdentityRepository::new();
        repository
            .expect_find_by_username()
            .withf(|username| username == "alice")
            .returning(|_| Ok(Some(alice())));
        repository
            .expect_find_by_username()
            .withf(|username| username == "ghost")
            .returning(|_| Ok(None));

        let service = service(
            repository,
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        let alice = Principal {
            username: "alice".to_string(),
            role: Role::User,
        };
        let profile = service.current_profile(&alice).await.unwrap();
        assert_eq!(profile.email.as_str(), "alice@example.com");

        let ghost = Principal {
            username: "ghost".to_string(),
            role: Role::User,
        };
        assert!(matches!(
            service.current_profile(&ghost).await,
            Err(AuthError::NotFound(_))
        ));
    }
}
