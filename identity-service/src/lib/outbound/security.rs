//! Adapters binding the shared `auth` crate to the domain's security ports.

use auth::Argon2Hasher;
use auth::JwtError;
use auth::JwtIssuer;

use crate::domain::identity::errors::AuthError;
use crate::domain::identity::models::IssuedToken;
use crate::domain::identity::models::Principal;
use crate::domain::identity::models::Role;
use crate::domain::identity::ports::PasswordHasher;
use crate::domain::identity::ports::TokenIssuer;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        Argon2Hasher::hash(self, password).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Argon2Hasher::verify(self, password, hash).map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, username: &str, role: Role) -> Result<IssuedToken, AuthError> {
        let issued = JwtIssuer::issue(self, username, role.as_str())
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))?;

        Ok(IssuedToken {
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = JwtIssuer::validate(self, token).map_err(|e| match e {
            JwtError::TokenExpired => AuthError::InvalidToken("token expired".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        })?;

        let role = claims
            .role
            .parse::<Role>()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(Principal {
            username: claims.sub,
            role,
        })
    }
}
