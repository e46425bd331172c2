//! Handlers for the session-guarded portfolio routes.
//!
//! The resolved caller identity arrives as a request extension from the
//! session middleware; every operation threads it into the service layer
//! explicitly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use super::{parse_body, DataResponse, ListResponse};
use crate::application::AppState;
use crate::auth::CurrentUser;
use crate::domain::entities::portfolio::Portfolio;
use crate::domain::errors::ApiError;
use crate::domain::services::valuation::{self, PortfolioSummary};

/// A portfolio as returned to the caller: the aggregate plus its derived
/// valuation summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub summary: PortfolioSummary,
}

impl From<Portfolio> for PortfolioView {
    fn from(portfolio: Portfolio) -> Self {
        let summary = valuation::summarize(&portfolio);
        PortfolioView { portfolio, summary }
    }
}

pub async fn list_portfolios(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ListResponse<PortfolioView>>, ApiError> {
    let portfolios = state.portfolios.list(&user.id).await?;
    let views = portfolios.into_iter().map(PortfolioView::from).collect();
    Ok(Json(ListResponse::new(views)))
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<PortfolioView>>, ApiError> {
    let portfolio = state.portfolios.get(&user.id, &id).await?;
    Ok(Json(DataResponse::new(portfolio.into())))
}

pub async fn create_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<DataResponse<PortfolioView>>), ApiError> {
    let payload = parse_body(body)?;
    let portfolio = state.portfolios.create(&user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(portfolio.into())),
    ))
}

pub async fn update_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<DataResponse<PortfolioView>>, ApiError> {
    let payload = parse_body(body)?;
    let portfolio = state.portfolios.update(&user.id, &id, payload).await?;
    Ok(Json(DataResponse::new(portfolio.into())))
}

pub async fn delete_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<serde_json::Value>>, ApiError> {
    state.portfolios.delete(&user.id, &id).await?;
    Ok(Json(DataResponse::new(serde_json::json!({}))))
}

pub async fn add_asset(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<DataResponse<PortfolioView>>, ApiError> {
    let payload = parse_body(body)?;
    let portfolio = state.portfolios.add_asset(&user.id, &id, payload).await?;
    Ok(Json(DataResponse::new(portfolio.into())))
}

pub async fn update_asset(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, asset_id)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<DataResponse<PortfolioView>>, ApiError> {
    let payload = parse_body(body)?;
    let portfolio = state
        .portfolios
        .update_asset(&user.id, &id, &asset_id, payload)
        .await?;
    Ok(Json(DataResponse::new(portfolio.into())))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, asset_id)): Path<(String, String)>,
) -> Result<Json<DataResponse<PortfolioView>>, ApiError> {
    let portfolio = state
        .portfolios
        .delete_asset(&user.id, &id, &asset_id)
        .await?;
    Ok(Json(DataResponse::new(portfolio.into())))
}

pub async fn sync_prices(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<PortfolioView>>, ApiError> {
    let portfolio = state.portfolios.sync_prices(&user.id, &id).await?;
    Ok(Json(DataResponse::new(portfolio.into())))
}
