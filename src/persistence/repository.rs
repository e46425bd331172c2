//! Database Repository
//!
//! Data access layer for users and portfolios.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::models::{PortfolioRecord, UserRecord};
use super::{DatabaseError, DbPool};
use crate::domain::entities::user::User;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user
    pub async fn create(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash,
                reset_token_hash, reset_token_expires, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.reset_token_hash)
        .bind(user.reset_token_expires)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            DatabaseError::QueryError(format!("Failed to create user: {}", e))
        })?;

        debug!("Created user: {}", user.id);
        Ok(())
    }

    /// Look up a user by normalized email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to look up user by email: {}", e);
                DatabaseError::QueryError(format!("Failed to look up user: {}", e))
            })?;

        Ok(record)
    }

    /// Look up a user by id
    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to look up user {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to look up user: {}", e))
            })?;

        Ok(record)
    }

    /// Store the one-way hash and expiry of a freshly issued reset token
    pub async fn set_reset_token(
        &self,
        user_id: &str,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            "UPDATE users SET reset_token_hash = ?1, reset_token_expires = ?2 WHERE id = ?3",
        )
        .bind(token_hash)
        .bind(expires)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to store reset token for {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to store reset token: {}", e))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!(
                "User not found: {}",
                user_id
            )));
        }

        debug!("Stored reset token for user: {}", user_id);
        Ok(())
    }

    /// Clear any pending reset token
    pub async fn clear_reset_token(&self, user_id: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = NULL, reset_token_expires = NULL WHERE id = ?1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to clear reset token for {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to clear reset token: {}", e))
        })?;

        debug!("Cleared reset token for user: {}", user_id);
        Ok(())
    }

    /// Atomically consume a reset token: set the new password hash and clear
    /// the reset fields in one statement, guarded by hash match and expiry.
    ///
    /// Returns the id of the affected user, or `None` when no user has a
    /// matching, unexpired token; the two cases are indistinguishable on
    /// purpose. Because the same statement clears the stored hash, a token
    /// can be consumed at most once.
    pub async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, DatabaseError> {
        let user_id = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE users
            SET password_hash = ?1, reset_token_hash = NULL, reset_token_expires = NULL
            WHERE reset_token_hash = ?2 AND reset_token_expires > ?3
            RETURNING id
            "#,
        )
        .bind(new_password_hash)
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to consume reset token: {}", e);
            DatabaseError::QueryError(format!("Failed to consume reset token: {}", e))
        })?;

        if let Some(id) = &user_id {
            debug!("Consumed reset token for user: {}", id);
        }
        Ok(user_id)
    }
}

/// Portfolio repository. Every write is a single-row statement against the
/// portfolio document, which is what gives mutations their atomicity.
#[derive(Clone)]
pub struct PortfolioRepository {
    pool: DbPool,
}

impl PortfolioRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new portfolio
    pub async fn create(&self, record: &PortfolioRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO portfolios (
                id, user_id, name, assets, target_amount, currency,
                total_invested_value, total_current_value, last_updated
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.name)
        .bind(&record.assets)
        .bind(record.target_amount)
        .bind(&record.currency)
        .bind(record.total_invested_value)
        .bind(record.total_current_value)
        .bind(record.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create portfolio: {}", e);
            DatabaseError::QueryError(format!("Failed to create portfolio: {}", e))
        })?;

        debug!("Created portfolio: {} for {}", record.id, record.user_id);
        Ok(())
    }

    /// Get portfolio by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<PortfolioRecord>, DatabaseError> {
        let record =
            sqlx::query_as::<_, PortfolioRecord>("SELECT * FROM portfolios WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to get portfolio {}: {}", id, e);
                    DatabaseError::QueryError(format!("Failed to get portfolio: {}", e))
                })?;

        Ok(record)
    }

    /// All portfolios owned by a user
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<PortfolioRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, PortfolioRecord>(
            "SELECT * FROM portfolios WHERE user_id = ?1 ORDER BY last_updated DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list portfolios for {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to list portfolios: {}", e))
        })?;

        Ok(records)
    }

    /// Replace the whole portfolio document (assets, totals, fields) in one
    /// UPDATE.
    pub async fn update(&self, record: &PortfolioRecord) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE portfolios
            SET name = ?1, assets = ?2, target_amount = ?3, currency = ?4,
                total_invested_value = ?5, total_current_value = ?6, last_updated = ?7
            WHERE id = ?8
            "#,
        )
        .bind(&record.name)
        .bind(&record.assets)
        .bind(record.target_amount)
        .bind(&record.currency)
        .bind(record.total_invested_value)
        .bind(record.total_current_value)
        .bind(record.last_updated)
        .bind(&record.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update portfolio {}: {}", record.id, e);
            DatabaseError::QueryError(format!("Failed to update portfolio: {}", e))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!(
                "Portfolio not found: {}",
                record.id
            )));
        }

        debug!("Updated portfolio: {}", record.id);
        Ok(())
    }

    /// Delete a portfolio document. Embedded assets go with the row.
    ///
    /// Returns `true` when a row was actually removed.
    pub async fn delete(&self, id: &str) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM portfolios WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete portfolio {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to delete portfolio: {}", e))
            })?
            .rows_affected();

        debug!("Deleted portfolio: {} (existed: {})", id, rows_affected > 0);
        Ok(rows_affected > 0)
    }
}
