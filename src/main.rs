use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cryptofolio::application::handlers::{auth_handler, portfolio_handler};
use cryptofolio::application::services::auth_service::AuthService;
use cryptofolio::application::services::portfolio_service::PortfolioService;
use cryptofolio::application::AppState;
use cryptofolio::auth;
use cryptofolio::config::AppConfig;
use cryptofolio::infrastructure::coingecko_client::CoinGeckoClient;
use cryptofolio::infrastructure::log_notifier::LogNotifier;
use cryptofolio::persistence;
use cryptofolio::persistence::repository::{PortfolioRepository, UserRepository};

/// Maximum accepted request body size. Portfolio payloads are small.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cryptofolio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env());

    let pool = persistence::init_database(&config.database_url).await?;
    let users = UserRepository::new(pool.clone());
    let portfolios = PortfolioRepository::new(pool.clone());

    let quotes = Arc::new(CoinGeckoClient::new(
        &config.quote_api_base,
        config.upstream_timeout,
    )?);
    let notifier = Arc::new(LogNotifier);

    let state = AppState {
        config: config.clone(),
        users: users.clone(),
        auth: Arc::new(AuthService::new(users, notifier, config.clone())),
        portfolios: Arc::new(PortfolioService::new(
            portfolios,
            quotes,
            config.upstream_timeout,
        )),
    };

    let protected = Router::new()
        .route(
            "/portfolios",
            get(portfolio_handler::list_portfolios).post(portfolio_handler::create_portfolio),
        )
        .route(
            "/portfolios/:id",
            get(portfolio_handler::get_portfolio)
                .put(portfolio_handler::update_portfolio)
                .delete(portfolio_handler::delete_portfolio),
        )
        .route("/portfolios/:id/assets", post(portfolio_handler::add_asset))
        .route(
            "/portfolios/:id/assets/:asset_id",
            axum::routing::put(portfolio_handler::update_asset)
                .delete(portfolio_handler::delete_asset),
        )
        .route(
            "/portfolios/:id/sync-prices",
            post(portfolio_handler::sync_prices),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth_handler::register))
        .route("/auth/login", post(auth_handler::login))
        .route("/auth/forgot-password", post(auth_handler::forgot_password))
        .route("/auth/reset-password", post(auth_handler::reset_password))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "running" }))
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
