//! SQLite database operations
//!
//! All database access goes through this module.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use std::time::Instant;

use super::models::*;
use super::store::FederationHostStore;
use crate::error::AppError;
use crate::metrics::observe_db_query;
use crate::validation::{NotValid, Validate};

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

const FEDERATION_HOST_COLUMNS: &str =
    "id, host_fqdn, software_name, latest_activity, created, updated";

/// Refuse to hand out a persisted record that no longer validates.
fn checked(row: FederationHostRow) -> Result<FederationHost, AppError> {
    let host = FederationHost::from(row);
    let violations = host.validate();
    if !violations.is_empty() {
        tracing::error!(
            host = %host.host_fqdn,
            id = host.id,
            "Persisted federation host failed validation"
        );
        return Err(NotValid::new(FederationHost::TYPE_NAME, violations).into());
    }
    Ok(host)
}

fn validated(host: &FederationHost) -> Result<(), AppError> {
    crate::validation::is_valid(host)?;
    Ok(())
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Instance actor
    // =========================================================================

    pub async fn get_instance_actor_keys(&self) -> Result<Option<InstanceActorKeys>, AppError> {
        let keys = sqlx::query_as::<_, InstanceActorKeys>(
            "SELECT private_key_pem, public_key_pem, created_at FROM instance_actor WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(keys)
    }

    /// Store the instance actor keys unless some are stored already.
    ///
    /// Atomic at the statement level, so concurrent initializers agree on
    /// one key pair.
    ///
    /// # Returns
    /// `true` if inserted, `false` if keys already existed.
    pub async fn insert_instance_actor_keys_if_empty(
        &self,
        keys: &InstanceActorKeys,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO instance_actor (id, private_key_pem, public_key_pem, created_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&keys.private_key_pem)
        .bind(&keys.public_key_pem)
        .bind(keys.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Federation hosts
    // =========================================================================

    pub async fn count_federation_hosts(&self) -> Result<i64, AppError> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM federation_host")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) async fn overwrite_software_name_for_test(
        &self,
        id: i64,
        software_name: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE federation_host SET software_name = ? WHERE id = ?")
            .bind(software_name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FederationHostStore for Database {
    async fn get_federation_host(&self, id: i64) -> Result<FederationHost, AppError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, FederationHostRow>(&format!(
            "SELECT {FEDERATION_HOST_COLUMNS} FROM federation_host WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        observe_db_query("select", "federation_host", started.elapsed());

        checked(row.ok_or(AppError::NotFound)?)
    }

    async fn find_federation_host_by_fqdn(
        &self,
        fqdn: &str,
    ) -> Result<Option<FederationHost>, AppError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, FederationHostRow>(&format!(
            "SELECT {FEDERATION_HOST_COLUMNS} FROM federation_host WHERE host_fqdn = ?"
        ))
        .bind(fqdn.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        observe_db_query("select", "federation_host", started.elapsed());

        row.map(checked).transpose()
    }

    async fn create_federation_host(
        &self,
        host: &FederationHost,
    ) -> Result<FederationHost, AppError> {
        validated(host)?;

        let started = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO federation_host (host_fqdn, software_name, latest_activity, created, updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(host_fqdn) DO NOTHING
            "#,
        )
        .bind(&host.host_fqdn)
        .bind(&host.node_info.software_name)
        .bind(host.latest_activity)
        .bind(host.created)
        .bind(host.updated)
        .execute(&self.pool)
        .await?;
        observe_db_query("insert", "federation_host", started.elapsed());

        if result.rows_affected() == 0 {
            tracing::debug!(
                host = %host.host_fqdn,
                "Federation host was created concurrently; using stored row"
            );
        }

        self.find_federation_host_by_fqdn(&host.host_fqdn)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "federation host {} vanished after insert",
                    host.host_fqdn
                ))
            })
    }

    async fn update_federation_host(&self, host: &FederationHost) -> Result<(), AppError> {
        validated(host)?;

        let started = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE federation_host
            SET software_name = ?, latest_activity = ?, updated = ?
            WHERE id = ?
            "#,
        )
        .bind(&host.node_info.software_name)
        .bind(host.latest_activity)
        .bind(Utc::now())
        .bind(host.id)
        .execute(&self.pool)
        .await?;
        observe_db_query("update", "federation_host", started.elapsed());

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
