use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;

/// Shortest HS256 secret accepted by [`JwtIssuer::new`].
pub const MIN_SECRET_LENGTH: usize = 32;

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates time-bounded identity tokens.
///
/// Stateless per call: everything needed to validate a token is in the token
/// itself plus the shared secret.
pub struct JwtIssuer {
    handler: JwtHandler,
    issuer: String,
    ttl: Duration,
}

impl JwtIssuer {
    /// Create an issuer signing with `secret`.
    ///
    /// # Arguments
    /// * `secret` - HS256 key, at least [`MIN_SECRET_LENGTH`] bytes
    /// * `issuer` - Value written to and required in the `iss` claim
    /// * `ttl` - Lifetime of issued tokens
    ///
    /// # Errors
    /// * `WeakSecret` - Secret is shorter than [`MIN_SECRET_LENGTH`]
    /// * `NonPositiveLifetime` - `ttl` is zero or negative
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::WeakSecret {
                min: MIN_SECRET_LENGTH,
                actual: secret.len(),
            });
        }

        if ttl <= Duration::zero() {
            return Err(JwtError::NonPositiveLifetime);
        }

        let issuer = issuer.into();
        Ok(Self {
            handler: JwtHandler::new(secret).with_issuer(&issuer),
            issuer,
            ttl,
        })
    }

    /// Sign a token asserting `subject` holds `role`.
    ///
    /// # Errors
    /// * `EncodingFailed` - Signing failed
    /// * `ExpiryOutOfRange` - Now plus the lifetime is past the representable date range
    pub fn issue(&self, subject: &str, role: &str) -> Result<IssuedToken, JwtError> {
        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(JwtError::ExpiryOutOfRange)?;
        let claims = Claims::new(subject, role, issued_at, expires_at).with_issuer(&self.issuer);

        Ok(IssuedToken {
            token: self.handler.encode(&claims)?,
            expires_at,
        })
    }

    /// Verify signature, issuer and expiry, then return the claims.
    ///
    /// # Errors
    /// * `TokenExpired` - Token is past its expiry
    /// * `InvalidToken` - Signature or issuer mismatch
    /// * `MissingClaim` - Subject or role absent or blank
    /// * `DecodingFailed` - Token is malformed
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let claims: Claims = self.handler.decode(token)?;
        claims.validate()?;
        Ok(claims)
    }
}
