//! Portfolio and asset aggregates.
//!
//! A portfolio embeds its assets; no asset exists outside a portfolio. The
//! denormalized `total_invested_value` / `total_current_value` fields must be
//! recomputed through [`Portfolio::recompute_totals`] before every persist;
//! there is no save-time hook doing it implicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::ApiError;

/// Wallet label applied when the caller does not name one.
pub const DEFAULT_WALLET: &str = "Bitget";

/// Portfolio currency applied when the caller does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// One holding inside a portfolio: symbol, quantity, cost basis, current
/// price and a free-text wallet label. Duplicate symbols across different
/// wallets are legal distinct holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub current_price: f64,
    pub wallet: String,
    pub last_updated: DateTime<Utc>,
}

/// A named collection of assets owned by one user, with derived valuation
/// totals. `user_id` is immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub assets: Vec<Asset>,
    pub target_amount: f64,
    pub currency: String,
    pub total_invested_value: f64,
    pub total_current_value: f64,
    pub last_updated: DateTime<Utc>,
}

impl Portfolio {
    /// Recompute the denormalized totals from the current asset set.
    ///
    /// Invariant: `total_invested_value = Σ quantity × buy_price` and
    /// `total_current_value = Σ quantity × current_price`. Call this before
    /// persisting any asset-set mutation.
    pub fn recompute_totals(&mut self) {
        self.total_invested_value = self
            .assets
            .iter()
            .map(|a| a.quantity * a.buy_price)
            .sum();
        self.total_current_value = self
            .assets
            .iter()
            .map(|a| a.quantity * a.current_price)
            .sum();
    }

    /// Distinct symbol set across all assets. A symbol held in several
    /// wallets is quoted once during price sync.
    pub fn distinct_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for asset in &self.assets {
            if !symbols.contains(&asset.symbol) {
                symbols.push(asset.symbol.clone());
            }
        }
        symbols
    }

    pub fn asset_mut(&mut self, asset_id: &str) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| a.id == asset_id)
    }
}

/// Payload for creating a portfolio.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPortfolio {
    pub name: String,
    pub target_amount: Option<f64>,
    pub currency: Option<String>,
}

impl NewPortfolio {
    /// Validate and build the aggregate for `user_id`. Totals start at zero;
    /// a missing target means no target (stored as 0).
    pub fn into_portfolio(self, user_id: &str) -> Result<Portfolio, ApiError> {
        let name = non_empty(&self.name, "portfolio name")?;
        let target_amount = self.target_amount.unwrap_or(0.0);
        non_negative(target_amount, "targetAmount")?;
        let currency = match self.currency {
            Some(c) if !c.trim().is_empty() => c.trim().to_string(),
            _ => DEFAULT_CURRENCY.to_string(),
        };
        Ok(Portfolio {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            assets: Vec::new(),
            target_amount,
            currency,
            total_invested_value: 0.0,
            total_current_value: 0.0,
            last_updated: Utc::now(),
        })
    }
}

/// Whitelisted portfolio field update. Unknown keys are rejected at
/// deserialization; `user_id` and the derived totals are not reachable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PortfolioUpdate {
    pub name: Option<String>,
    pub target_amount: Option<f64>,
    pub currency: Option<String>,
}

impl PortfolioUpdate {
    pub fn apply(self, portfolio: &mut Portfolio) -> Result<(), ApiError> {
        if let Some(name) = self.name {
            portfolio.name = non_empty(&name, "portfolio name")?;
        }
        if let Some(target) = self.target_amount {
            non_negative(target, "targetAmount")?;
            portfolio.target_amount = target;
        }
        if let Some(currency) = self.currency {
            let currency = currency.trim().to_string();
            if currency.is_empty() {
                return Err(ApiError::Validation(
                    "currency must not be empty".to_string(),
                ));
            }
            portfolio.currency = currency;
        }
        Ok(())
    }
}

/// Payload for adding an asset to a portfolio.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAsset {
    pub symbol: String,
    pub name: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub current_price: Option<f64>,
    pub wallet: Option<String>,
}

impl NewAsset {
    /// Validate and build the asset. The symbol is normalized to upper-case;
    /// a missing `current_price` defaults to the cost basis so the field is
    /// always present after creation.
    pub fn into_asset(self) -> Result<Asset, ApiError> {
        let symbol = normalize_symbol(&self.symbol)?;
        let name = non_empty(&self.name, "asset name")?;
        non_negative(self.quantity, "quantity")?;
        non_negative(self.buy_price, "buyPrice")?;
        let current_price = match self.current_price {
            Some(price) => {
                non_negative(price, "currentPrice")?;
                price
            }
            None => self.buy_price,
        };
        let wallet = match self.wallet {
            Some(w) if !w.trim().is_empty() => w.trim().to_string(),
            _ => DEFAULT_WALLET.to_string(),
        };
        Ok(Asset {
            id: Uuid::new_v4().to_string(),
            symbol,
            name,
            quantity: self.quantity,
            buy_price: self.buy_price,
            current_price,
            wallet,
            last_updated: Utc::now(),
        })
    }
}

/// Whitelisted partial asset update with per-field range validation.
/// Arbitrary key/value application is not supported: unknown keys fail
/// deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssetUpdate {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub buy_price: Option<f64>,
    pub current_price: Option<f64>,
    pub wallet: Option<String>,
}

impl AssetUpdate {
    pub fn apply(self, asset: &mut Asset) -> Result<(), ApiError> {
        if let Some(symbol) = self.symbol {
            asset.symbol = normalize_symbol(&symbol)?;
        }
        if let Some(name) = self.name {
            asset.name = non_empty(&name, "asset name")?;
        }
        if let Some(quantity) = self.quantity {
            non_negative(quantity, "quantity")?;
            asset.quantity = quantity;
        }
        if let Some(buy_price) = self.buy_price {
            non_negative(buy_price, "buyPrice")?;
            asset.buy_price = buy_price;
        }
        if let Some(current_price) = self.current_price {
            non_negative(current_price, "currentPrice")?;
            asset.current_price = current_price;
        }
        if let Some(wallet) = self.wallet {
            let wallet = wallet.trim().to_string();
            if wallet.is_empty() {
                return Err(ApiError::Validation("wallet must not be empty".to_string()));
            }
            asset.wallet = wallet;
        }
        asset.last_updated = Utc::now();
        Ok(())
    }
}

fn normalize_symbol(raw: &str) -> Result<String, ApiError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::Validation("symbol must not be empty".to_string()));
    }
    Ok(symbol)
}

fn non_empty(raw: &str, field: &str) -> Result<String, ApiError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

fn non_negative(value: f64, field: &str) -> Result<(), ApiError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::Validation(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}
