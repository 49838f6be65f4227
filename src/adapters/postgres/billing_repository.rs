//! PostgreSQL implementation of BillingRepository.
//!
//! A unit of work owns one database transaction. The dedup insert, every
//! state write and the outcome label commit together; dropping the unit of
//! work rolls the transaction back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::account::User;
use crate::domain::billing::{PaymentRecord, Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{BillingRepository, BillingUnitOfWork, SaveResult};

use super::user_repository::{db_error, UserRow, USER_COLUMNS};

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, customer_id, status, current_period_start, \
    current_period_end, cancel_at_period_end, last_payment_at, last_payment_amount, \
    last_payment_currency, last_event_at, created_at, updated_at";

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    user_id: Uuid,
    customer_id: String,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    last_payment_at: Option<DateTime<Utc>>,
    last_payment_amount: Option<i64>,
    last_payment_currency: Option<String>,
    last_event_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;

        let last_payment = match (
            row.last_payment_at,
            row.last_payment_amount,
            row.last_payment_currency,
        ) {
            (Some(paid_at), Some(amount), Some(currency)) => Some(PaymentRecord {
                paid_at: Timestamp::from_datetime(paid_at),
                amount,
                currency,
            }),
            _ => None,
        };

        Ok(Subscription {
            id: row.id,
            user_id: UserId::from_uuid(row.user_id),
            customer_id: row.customer_id,
            status,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            last_payment,
            last_event_at: Timestamp::from_datetime(row.last_event_at),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse().map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription status value: {}", s),
        )
    })
}

/// PostgreSQL implementation of the BillingRepository port.
pub struct PostgresBillingRepository {
    pool: PgPool,
}

impl PostgresBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn begin(&self) -> Result<Box<dyn BillingUnitOfWork>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        Ok(Box::new(PostgresBillingUnitOfWork { tx }))
    }

    async fn list_subscriptions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SUBSCRIPTION_COLUMNS
        );
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

struct PostgresBillingUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PostgresBillingUnitOfWork {
    async fn update_user_flag(
        &mut self,
        column: &'static str,
        user_id: &UserId,
        value: bool,
    ) -> Result<(), DomainError> {
        let sql = format!(
            "UPDATE users SET {} = $2, updated_at = NOW() WHERE id = $1",
            column
        );
        let result = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .bind(value)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to update user", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", user_id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingUnitOfWork for PostgresBillingUnitOfWork {
    async fn mark_event_processed(
        &mut self,
        event_id: &str,
        event_type: &str,
    ) -> Result<SaveResult, DomainError> {
        // Concurrent deliveries of the same id block here until the first
        // transaction commits or rolls back.
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to record event", e))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn record_event_outcome(
        &mut self,
        event_id: &str,
        outcome: &str,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE processed_events SET outcome = $2 WHERE event_id = $1")
            .bind(event_id)
            .bind(outcome)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to record event outcome", e))?;
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to load user", e))?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_customer_id(
        &mut self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError> {
        let sql = format!(
            "SELECT {} FROM users WHERE stripe_customer_id = $1 ORDER BY created_at LIMIT 1",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to load user", e))?;

        Ok(row.map(User::from))
    }

    async fn attach_customer_id(
        &mut self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE users SET stripe_customer_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id.as_uuid())
        .bind(customer_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to attach customer", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", user_id),
            ));
        }
        Ok(())
    }

    async fn find_subscription(
        &mut self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(subscription_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to load subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn list_user_subscriptions(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SUBSCRIPTION_COLUMNS
        );
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to list subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn upsert_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        let payment = subscription.last_payment.as_ref();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, customer_id, status, current_period_start, current_period_end,
                cancel_at_period_end, last_payment_at, last_payment_amount, last_payment_currency,
                last_event_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                last_payment_at = EXCLUDED.last_payment_at,
                last_payment_amount = EXCLUDED.last_payment_amount,
                last_payment_currency = EXCLUDED.last_payment_currency,
                last_event_at = EXCLUDED.last_event_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&subscription.id)
        .bind(subscription.user_id.as_uuid())
        .bind(&subscription.customer_id)
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.cancel_at_period_end)
        .bind(payment.map(|p| *p.paid_at.as_datetime()))
        .bind(payment.map(|p| p.amount))
        .bind(payment.map(|p| p.currency.clone()))
        .bind(subscription.last_event_at.as_datetime())
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save subscription", e))?;

        Ok(())
    }

    async fn update_user_access_flag(
        &mut self,
        user_id: &UserId,
        has_access: bool,
    ) -> Result<(), DomainError> {
        self.update_user_flag("has_access", user_id, has_access).await
    }

    async fn set_payment_alert(&mut self, user_id: &UserId, alert: bool) -> Result<(), DomainError> {
        self.update_user_flag("payment_alert", user_id, alert).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))
    }
}
