use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::errors::JwtError;

/// Identity token payload.
///
/// Carries the standard RFC 7519 time claims plus a single `role` claim.
/// The subject is the account's username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Role granted to the subject
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Build claims for `subject` valid from `issued_at` until `expires_at`.
    pub fn new(
        subject: impl ToString,
        role: impl ToString,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: None,
        }
    }

    /// Build claims for `subject` that expire `ttl` from now.
    ///
    /// # Errors
    /// * `ExpiryOutOfRange` - `now + ttl` is not a representable instant
    pub fn for_subject(
        subject: impl ToString,
        role: impl ToString,
        ttl: Duration,
    ) -> Result<Self, JwtError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(JwtError::ExpiryOutOfRange)?;
        Ok(Self::new(subject, role, now, expires_at))
    }

    /// Set issuer.
    pub fn with_issuer(mut self, iss: impl ToString) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    /// Set expiration (Unix timestamp).
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    /// Expiration as a UTC instant, if the timestamp is representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }

    /// Reject claims whose subject or role is blank.
    ///
    /// Runs after signature verification, so a failure here means the token
    /// was minted by something that shares our secret but not our contract.
    pub fn validate(&self) -> Result<(), JwtError> {
        if self.sub.trim().is_empty() {
            return Err(JwtError::MissingClaim("sub".to_string()));
        }
        if self.role.trim().is_empty() {
            return Err(JwtError::MissingClaim("role".to_string()));
        }
        Ok(())
    }
}
