//! Portfolio API orchestration: CRUD, asset mutations and price sync.
//!
//! Every operation runs the same pipeline: load the portfolio document,
//! check ownership, apply the change, recompute the denormalized totals and
//! persist the whole document in one UPDATE. Ownership failures map to
//! `Forbidden` and missing documents to `NotFound`, never interchanged.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::entities::portfolio::{
    AssetUpdate, NewAsset, NewPortfolio, Portfolio, PortfolioUpdate,
};
use crate::domain::errors::ApiError;
use crate::domain::repositories::quote_provider::QuoteProvider;
use crate::persistence::models::PortfolioRecord;
use crate::persistence::repository::PortfolioRepository;

pub struct PortfolioService {
    portfolios: PortfolioRepository,
    quotes: Arc<dyn QuoteProvider>,
    upstream_timeout: Duration,
}

impl PortfolioService {
    pub fn new(
        portfolios: PortfolioRepository,
        quotes: Arc<dyn QuoteProvider>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            portfolios,
            quotes,
            upstream_timeout,
        }
    }

    /// All portfolios owned by the caller.
    pub async fn list(&self, caller: &str) -> Result<Vec<Portfolio>, ApiError> {
        let records = self.portfolios.list_by_user(caller).await?;
        let mut portfolios = Vec::with_capacity(records.len());
        for record in records {
            portfolios.push(record.into_domain()?);
        }
        Ok(portfolios)
    }

    /// One portfolio, with ownership check.
    pub async fn get(&self, caller: &str, id: &str) -> Result<Portfolio, ApiError> {
        self.load_owned(caller, id).await
    }

    pub async fn create(&self, caller: &str, payload: NewPortfolio) -> Result<Portfolio, ApiError> {
        let portfolio = payload.into_portfolio(caller)?;
        let record = PortfolioRecord::from_domain(&portfolio)?;
        self.portfolios.create(&record).await?;
        info!("Created portfolio {} for user {}", portfolio.id, caller);
        Ok(portfolio)
    }

    pub async fn update(
        &self,
        caller: &str,
        id: &str,
        update: PortfolioUpdate,
    ) -> Result<Portfolio, ApiError> {
        let mut portfolio = self.load_owned(caller, id).await?;
        update.apply(&mut portfolio)?;
        self.persist(portfolio).await
    }

    /// Delete a portfolio document; embedded assets go with it.
    pub async fn delete(&self, caller: &str, id: &str) -> Result<(), ApiError> {
        let portfolio = self.load_owned(caller, id).await?;
        if !self.portfolios.delete(&portfolio.id).await? {
            return Err(ApiError::NotFound("Portfolio"));
        }
        info!("Deleted portfolio {} for user {}", portfolio.id, caller);
        Ok(())
    }

    pub async fn add_asset(
        &self,
        caller: &str,
        id: &str,
        payload: NewAsset,
    ) -> Result<Portfolio, ApiError> {
        let mut portfolio = self.load_owned(caller, id).await?;
        portfolio.assets.push(payload.into_asset()?);
        self.persist(portfolio).await
    }

    pub async fn update_asset(
        &self,
        caller: &str,
        id: &str,
        asset_id: &str,
        update: AssetUpdate,
    ) -> Result<Portfolio, ApiError> {
        let mut portfolio = self.load_owned(caller, id).await?;
        let asset = portfolio
            .asset_mut(asset_id)
            .ok_or(ApiError::NotFound("Asset"))?;
        update.apply(asset)?;
        self.persist(portfolio).await
    }

    pub async fn delete_asset(
        &self,
        caller: &str,
        id: &str,
        asset_id: &str,
    ) -> Result<Portfolio, ApiError> {
        let mut portfolio = self.load_owned(caller, id).await?;
        let before = portfolio.assets.len();
        portfolio.assets.retain(|a| a.id != asset_id);
        if portfolio.assets.len() == before {
            return Err(ApiError::NotFound("Asset"));
        }
        self.persist(portfolio).await
    }

    /// Reconcile asset prices against the quote provider.
    ///
    /// One batched call covers the portfolio's distinct symbols. Assets whose
    /// symbol has a quote get the new price and a fresh timestamp; unquoted
    /// assets are left as they are. A provider failure (transport, non-2xx,
    /// timeout) aborts before anything is written, so the stored portfolio is
    /// untouched and the caller can retry the whole operation.
    pub async fn sync_prices(&self, caller: &str, id: &str) -> Result<Portfolio, ApiError> {
        let mut portfolio = self.load_owned(caller, id).await?;
        let symbols = portfolio.distinct_symbols();

        if !symbols.is_empty() {
            let quotes = match tokio::time::timeout(
                self.upstream_timeout,
                self.quotes.fetch_prices(&symbols),
            )
            .await
            {
                Ok(Ok(quotes)) => quotes,
                Ok(Err(e)) => {
                    warn!("Price sync failed for portfolio {}: {}", portfolio.id, e);
                    return Err(e.into());
                }
                Err(_) => {
                    warn!(
                        "Price sync timed out for portfolio {} after {:?}",
                        portfolio.id, self.upstream_timeout
                    );
                    return Err(ApiError::UpstreamUnavailable(format!(
                        "{} request timed out",
                        self.quotes.name()
                    )));
                }
            };

            let now = Utc::now();
            let mut updated = 0usize;
            for asset in &mut portfolio.assets {
                if let Some(price) = quotes.get(&asset.symbol) {
                    asset.current_price = *price;
                    asset.last_updated = now;
                    updated += 1;
                }
            }
            info!(
                "Price sync for portfolio {}: {}/{} symbols quoted, {} assets updated",
                portfolio.id,
                quotes.len(),
                symbols.len(),
                updated
            );
        }

        self.persist(portfolio).await
    }

    async fn load_owned(&self, caller: &str, id: &str) -> Result<Portfolio, ApiError> {
        let record = self
            .portfolios
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound("Portfolio"))?;
        let portfolio = record.into_domain()?;
        if portfolio.user_id != caller {
            return Err(ApiError::Forbidden);
        }
        Ok(portfolio)
    }

    /// Recompute totals, stamp the document and write it back in one UPDATE.
    async fn persist(&self, mut portfolio: Portfolio) -> Result<Portfolio, ApiError> {
        portfolio.recompute_totals();
        portfolio.last_updated = Utc::now();
        let record = PortfolioRecord::from_domain(&portfolio)?;
        self.portfolios.update(&record).await?;
        Ok(portfolio)
    }
}
