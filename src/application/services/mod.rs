pub mod auth_service;
pub mod portfolio_service;
