use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::identity::errors::AuthError;
use crate::domain::identity::errors::UniqueField;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::Role;
use crate::domain::identity::models::Username;
use crate::domain::identity::ports::IdentityRepository;

const USERNAME_CONSTRAINT: &str = "identities_username_key";
const EMAIL_CONSTRAINT: &str = "identities_email_key";

pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_identity(row: PgRow) -> Result<Identity, AuthError> {
        let database = |e: sqlx::Error| AuthError::Database(e.to_string());

        let id: Uuid = row.try_get("id").map_err(database)?;
        let username: String = row.try_get("username").map_err(database)?;
        let email: String = row.try_get("email").map_err(database)?;
        let role: String = row.try_get("role").map_err(database)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(database)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(database)?;

        // Stored rows passed validation on the way in; failing here means the
        // table was written to by something else.
        Ok(Identity {
            id: IdentityId(id),
            username: Username::new(username)
                .map_err(|e| AuthError::Database(format!("corrupt username column: {}", e)))?,
            email: EmailAddress::new(email)
                .map_err(|e| AuthError::Database(format!("corrupt email column: {}", e)))?,
            password_hash: row.try_get("password_hash").map_err(database)?,
            role: role
                .parse::<Role>()
                .map_err(|e| AuthError::Database(format!("corrupt role column: {}", e)))?,
            active: row.try_get("active").map_err(database)?,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO identities
                (id, username, email, password_hash, role, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(identity.id.0)
        .bind(identity.username.as_str())
        .bind(identity.email.as_str())
        .bind(&identity.password_hash)
        .bind(identity.role.as_str())
        .bind(identity.active)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    match db_err.constraint() {
                        Some(USERNAME_CONSTRAINT) => {
                            return AuthError::UniquenessViolation(UniqueField::Username)
                        }
                        Some(EMAIL_CONSTRAINT) => {
                            return AuthError::UniquenessViolation(UniqueField::Email)
                        }
                        _ => {}
                    }
                }
            }
            AuthError::Database(e.to_string())
        })?;

        Ok(identity)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, role, active, created_at, updated_at
            FROM identities
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?;

        row.map(Self::row_to_identity).transpose()
    }

    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, role, active, created_at, updated_at
            FROM identities
            WHERE username = $1 OR email = $1
            ORDER BY (username = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?;

        row.map(Self::row_to_identity).transpose()
    }

    async fn exists_by_username(&self, username: &Username) -> Result<bool, AuthError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM identities WHERE username = $1)",
        )
        .bind(username.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))
    }

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, AuthError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM identities WHERE email = $1)")
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))
    }
}
