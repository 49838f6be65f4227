//! PostgreSQL implementation of UserRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::User;
use crate::domain::billing::BillingAddress;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::UserRepository;

/// Column list shared by every query that loads a `User`.
pub(super) const USER_COLUMNS: &str = "id, email, password_hash, stripe_customer_id, \
    has_access, payment_alert, billing_name, billing_line1, billing_line2, billing_city, \
    billing_state, billing_postal_code, billing_country, created_at, updated_at";

/// Database row representation of a user.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    stripe_customer_id: Option<String>,
    has_access: bool,
    payment_alert: bool,
    billing_name: Option<String>,
    billing_line1: Option<String>,
    billing_line2: Option<String>,
    billing_city: Option<String>,
    billing_state: Option<String>,
    billing_postal_code: Option<String>,
    billing_country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let address = BillingAddress {
            name: row.billing_name,
            line1: row.billing_line1,
            line2: row.billing_line2,
            city: row.billing_city,
            state: row.billing_state,
            postal_code: row.billing_postal_code,
            country: row.billing_country,
        };
        let billing_address = if address.is_empty() && address.name.is_none() {
            None
        } else {
            Some(address)
        };

        User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            stripe_customer_id: row.stripe_customer_id,
            has_access: row.has_access,
            payment_alert: row.payment_alert,
            billing_address,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

pub(super) fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err))
}

/// PostgreSQL implementation of the UserRepository port.
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load user", e))?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load user", e))?;

        Ok(row.map(User::from))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check user", e))?;

        Ok(exists)
    }

    async fn create(&self, user: &User) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, has_access, payment_alert, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.has_access)
        .bind(user.payment_alert)
        .bind(user.created_at.as_datetime())
        .bind(user.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("users_email_key") {
                    return DomainError::new(
                        ErrorCode::UserExists,
                        format!("User already exists: {}", user.email),
                    );
                }
            }
            db_error("Failed to create user", e)
        })?;

        Ok(())
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update password", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", id),
            ));
        }
        Ok(())
    }

    async fn update_billing_address(
        &self,
        id: &UserId,
        address: &BillingAddress,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                billing_name = $2,
                billing_line1 = $3,
                billing_line2 = $4,
                billing_city = $5,
                billing_state = $6,
                billing_postal_code = $7,
                billing_country = $8,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&address.name)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update billing address", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", id),
            ));
        }
        Ok(())
    }
}
