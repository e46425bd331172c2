//! Database Models
//!
//! Row-level records for users and portfolios, plus conversions to and from
//! the domain aggregates. The portfolio's asset set travels as one JSON
//! document in the `assets` column.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DatabaseError;
use crate::domain::entities::portfolio::{Asset, Portfolio};
use crate::domain::entities::user::User;

/// User record in database
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            name: record.name,
            email: record.email,
            password_hash: record.password_hash,
            reset_token_hash: record.reset_token_hash,
            reset_token_expires: record.reset_token_expires,
            created_at: record.created_at,
        }
    }
}

/// Portfolio record in database. `assets` holds the embedded asset array as
/// a JSON string.
#[derive(Debug, Clone, FromRow)]
pub struct PortfolioRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub assets: String,
    pub target_amount: f64,
    pub currency: String,
    pub total_invested_value: f64,
    pub total_current_value: f64,
    pub last_updated: DateTime<Utc>,
}

impl PortfolioRecord {
    pub fn from_domain(portfolio: &Portfolio) -> Result<Self, DatabaseError> {
        let assets = serde_json::to_string(&portfolio.assets).map_err(|e| {
            DatabaseError::CorruptRecord(format!("Failed to serialize assets: {}", e))
        })?;
        Ok(PortfolioRecord {
            id: portfolio.id.clone(),
            user_id: portfolio.user_id.clone(),
            name: portfolio.name.clone(),
            assets,
            target_amount: portfolio.target_amount,
            currency: portfolio.currency.clone(),
            total_invested_value: portfolio.total_invested_value,
            total_current_value: portfolio.total_current_value,
            last_updated: portfolio.last_updated,
        })
    }

    pub fn into_domain(self) -> Result<Portfolio, DatabaseError> {
        let assets: Vec<Asset> = serde_json::from_str(&self.assets).map_err(|e| {
            DatabaseError::CorruptRecord(format!(
                "Failed to parse assets for portfolio {}: {}",
                self.id, e
            ))
        })?;
        Ok(Portfolio {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            assets,
            target_amount: self.target_amount,
            currency: self.currency,
            total_invested_value: self.total_invested_value,
            total_current_value: self.total_current_value,
            last_updated: self.last_updated,
        })
    }
}
