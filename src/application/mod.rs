pub mod handlers;
pub mod services;

use std::sync::Arc;

use crate::application::services::auth_service::AuthService;
use crate::application::services::portfolio_service::PortfolioService;
use crate::config::AppConfig;
use crate::persistence::repository::UserRepository;

/// Shared state handed to every handler and to the session middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserRepository,
    pub auth: Arc<AuthService>,
    pub portfolios: Arc<PortfolioService>,
}
