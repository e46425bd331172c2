//! Pure valuation computations over a portfolio snapshot.
//!
//! No I/O and no clock: everything here is a function of the data it is
//! given, which keeps the aggregate math trivially testable.

use serde::Serialize;

use crate::domain::entities::portfolio::{Asset, Portfolio};

/// Aggregate invested/current totals with absolute and relative profit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationSummary {
    pub total_invested: f64,
    pub total_current: f64,
    pub profit: f64,
    pub profit_pct: f64,
}

/// One ranked holding: its symbol and the per-unit return in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformerSnapshot {
    pub symbol: String,
    pub name: String,
    pub return_pct: f64,
}

/// Full derived view of a portfolio, attached to read responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub valuation: ValuationSummary,
    pub best_performer: Option<PerformerSnapshot>,
    pub worst_performer: Option<PerformerSnapshot>,
    pub target_progress: f64,
}

/// Aggregate totals and profit for a portfolio snapshot.
///
/// `profit_pct` is defined as 0 when nothing is invested.
pub fn aggregate(portfolio: &Portfolio) -> ValuationSummary {
    let total_invested: f64 = portfolio
        .assets
        .iter()
        .map(|a| a.quantity * a.buy_price)
        .sum();
    let total_current: f64 = portfolio
        .assets
        .iter()
        .map(|a| a.quantity * a.current_price)
        .sum();
    let profit = total_current - total_invested;
    let profit_pct = if total_invested == 0.0 {
        0.0
    } else {
        profit / total_invested * 100.0
    };
    ValuationSummary {
        total_invested,
        total_current,
        profit,
        profit_pct,
    }
}

/// Best and worst performing assets by per-unit return
/// `(current_price - buy_price) / buy_price`.
///
/// Assets with a zero cost basis have no defined return and are excluded.
/// Returns `None` when no rankable asset exists. Ties keep the
/// first-encountered asset.
pub fn rank_performers(assets: &[Asset]) -> Option<(&Asset, &Asset)> {
    let mut best: Option<(&Asset, f64)> = None;
    let mut worst: Option<(&Asset, f64)> = None;
    for asset in assets {
        if asset.buy_price == 0.0 {
            continue;
        }
        let ret = asset_return(asset);
        match best {
            Some((_, best_ret)) if ret <= best_ret => {}
            _ => best = Some((asset, ret)),
        }
        match worst {
            Some((_, worst_ret)) if ret >= worst_ret => {}
            _ => worst = Some((asset, ret)),
        }
    }
    match (best, worst) {
        (Some((b, _)), Some((w, _))) => Some((b, w)),
        _ => None,
    }
}

/// Progress toward the portfolio target in percent; 0 when no target is set.
pub fn target_progress(portfolio: &Portfolio) -> f64 {
    if portfolio.target_amount > 0.0 {
        portfolio.total_current_value / portfolio.target_amount * 100.0
    } else {
        0.0
    }
}

/// Compose the full summary for a read response.
pub fn summarize(portfolio: &Portfolio) -> PortfolioSummary {
    let performers = rank_performers(&portfolio.assets);
    PortfolioSummary {
        valuation: aggregate(portfolio),
        best_performer: performers.map(|(best, _)| snapshot(best)),
        worst_performer: performers.map(|(_, worst)| snapshot(worst)),
        target_progress: target_progress(portfolio),
    }
}

fn asset_return(asset: &Asset) -> f64 {
    (asset.current_price - asset.buy_price) / asset.buy_price
}

fn snapshot(asset: &Asset) -> PerformerSnapshot {
    PerformerSnapshot {
        symbol: asset.symbol.clone(),
        name: asset.name.clone(),
        return_pct: asset_return(asset) * 100.0,
    }
}
