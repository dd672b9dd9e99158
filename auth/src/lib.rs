//! Authentication utilities library
//!
//! Provides reusable authentication infrastructure for services:
//! - Password hashing (Argon2id)
//! - JWT claims, encoding and validation
//! - Token issuance with a fixed lifetime and issuer
//!
//! Each service defines its own authentication traits and adapts these implementations.
//! This avoids coupling services through shared domain logic while reducing code duplication.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::Argon2Hasher;
//!
//! let hasher = Argon2Hasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Issuing and Validating Tokens
//! ```
//! use auth::JwtIssuer;
//! use chrono::Duration;
//!
//! let issuer = JwtIssuer::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     "identity-service",
//!     Duration::hours(24),
//! )
//! .unwrap();
//!
//! let issued = issuer.issue("alice", "USER").unwrap();
//! let claims = issuer.validate(&issued.token).unwrap();
//! assert_eq!(claims.sub, "alice");
//! assert_eq!(claims.role, "USER");
//! ```

pub mod issuer;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use issuer::IssuedToken;
pub use issuer::JwtIssuer;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::Argon2Hasher;
pub use password::PasswordError;
