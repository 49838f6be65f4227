//! Postgres pool settings (`PAYFLOW__DATABASE__*`).
//!
//! Every webhook delivery holds one pooled connection for the length of its
//! reconciliation transaction, so `max_connections` bounds how many
//! deliveries reconcile at once.

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

/// Largest pool the service will open.
const POOL_CEILING: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` URL of the billing database.
    pub url: String,

    /// Connections kept open while idle.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a request waits for a free connection before failing.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Apply the embedded `migrations/` before serving.
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    /// Builder for the shared pool; the caller supplies the URL on connect.
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout())
            .idle_timeout(Some(self.idle_timeout()))
            .max_lifetime(Some(self.max_lifetime()))
    }

    /// Rejects a missing or non-Postgres URL and inconsistent pool bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        let is_postgres = ["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme));
        if !is_postgres {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > POOL_CEILING {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            run_migrations: false,
        }
    }
}

fn default_min_connections() -> u32 {
    5
}

fn default_max_connections() -> u32 {
    20
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_max_lifetime() -> u64 {
    1800
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_leave_migrations_to_the_operator() {
        let config = DatabaseConfig::default();

        assert_eq!(config.min_connections, 5);
        assert_eq!(config.max_connections, 20);
        assert!(!config.run_migrations);
    }

    #[test]
    fn second_fields_become_durations() {
        let config = DatabaseConfig {
            acquire_timeout_secs: 3,
            idle_timeout_secs: 90,
            max_lifetime_secs: 900,
            ..Default::default()
        };

        assert_eq!(config.acquire_timeout(), Duration::from_secs(3));
        assert_eq!(config.idle_timeout(), Duration::from_secs(90));
        assert_eq!(config.max_lifetime(), Duration::from_secs(900));
    }

    #[test]
    fn both_postgres_schemes_pass() {
        assert!(with_url("postgres://payflow@localhost/payflow").validate().is_ok());
        assert!(with_url("postgresql://payflow:pw@db:5432/billing").validate().is_ok());
    }

    #[test]
    fn empty_url_names_the_missing_variable() {
        let result = DatabaseConfig::default().validate();

        assert!(matches!(
            result,
            Err(ValidationError::MissingRequired("DATABASE__URL"))
        ));
    }

    #[test]
    fn non_postgres_url_is_refused() {
        let result = with_url("sqlite://payflow.db").validate();

        assert!(matches!(result, Err(ValidationError::InvalidDatabaseUrl)));
    }

    #[test]
    fn floor_above_ceiling_is_refused() {
        let config = DatabaseConfig {
            min_connections: 8,
            max_connections: 4,
            ..with_url("postgres://localhost/payflow")
        };

        assert!(matches!(config.validate(), Err(ValidationError::InvalidPoolSize)));
    }

    #[test]
    fn oversized_pool_is_refused() {
        let config = DatabaseConfig {
            max_connections: POOL_CEILING + 1,
            ..with_url("postgres://localhost/payflow")
        };

        assert!(matches!(config.validate(), Err(ValidationError::PoolSizeTooLarge)));
    }

    #[test]
    fn pool_at_ceiling_is_accepted() {
        let config = DatabaseConfig {
            min_connections: POOL_CEILING,
            max_connections: POOL_CEILING,
            ..with_url("postgres://localhost/payflow")
        };

        assert!(config.validate().is_ok());
    }
}
