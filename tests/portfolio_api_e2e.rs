//! Portfolio Service End-to-End Tests
//!
//! Exercises the application services against an in-memory SQLite store with
//! mock collaborators for the quote provider and the reset notifier.
//!
//! Test Categories:
//! 1. Registration & Login - credential lifecycle and session tokens
//! 2. Portfolio & Asset CRUD - totals invariant after every mutation
//! 3. Price Sync - partial success, idempotence, upstream failure rollback
//! 4. Authorization - Forbidden vs NotFound vs bad credentials
//! 5. Password Reset - one-time use, expiry, failed-send cleanup

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Mutex;

use cryptofolio::application::services::auth_service::AuthService;
use cryptofolio::application::services::portfolio_service::PortfolioService;
use cryptofolio::auth;
use cryptofolio::config::AppConfig;
use cryptofolio::domain::entities::portfolio::{AssetUpdate, NewAsset, NewPortfolio, Portfolio};
use cryptofolio::domain::errors::ApiError;
use cryptofolio::domain::repositories::notifier::{NotifyError, ResetNotifier};
use cryptofolio::domain::repositories::quote_provider::{QuoteError, QuoteProvider};
use cryptofolio::domain::services::valuation;
use cryptofolio::persistence::repository::{PortfolioRepository, UserRepository};

const TEST_SECRET: &str = "e2e-test-secret-0123456789abcdef";

/// Quote provider serving a fixed quote set, or failing outright.
struct MockQuoteProvider {
    quotes: HashMap<String, f64>,
    fail: bool,
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        "MockQuotes"
    }

    async fn fetch_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>, QuoteError> {
        if self.fail {
            return Err(QuoteError::Transport("connection refused".to_string()));
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.quotes.get(s).map(|p| (s.clone(), *p)))
            .collect())
    }
}

/// Notifier capturing every dispatched reset link, or failing outright.
#[derive(Default)]
struct CapturingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

#[async_trait]
impl ResetNotifier for CapturingNotifier {
    async fn send_reset_link(&self, email: &str, reset_url: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Dispatch("smtp unavailable".to_string()));
        }
        self.sent
            .lock()
            .await
            .push((email.to_string(), reset_url.to_string()));
        Ok(())
    }
}

struct TestApp {
    users: UserRepository,
    auth: AuthService,
    portfolios: PortfolioService,
    notifier: Arc<CapturingNotifier>,
}

async fn setup(quotes: HashMap<String, f64>) -> TestApp {
    setup_with(quotes, false, false).await
}

async fn setup_with(
    quotes: HashMap<String, f64>,
    provider_fails: bool,
    notifier_fails: bool,
) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    cryptofolio::persistence::run_migrations(&pool)
        .await
        .expect("migrations");

    let config = Arc::new(AppConfig::with_secret(TEST_SECRET));
    let users = UserRepository::new(pool.clone());
    let notifier = Arc::new(CapturingNotifier {
        sent: Mutex::new(Vec::new()),
        fail: notifier_fails,
    });
    let auth = AuthService::new(users.clone(), notifier.clone(), config.clone());
    let portfolios = PortfolioService::new(
        PortfolioRepository::new(pool),
        Arc::new(MockQuoteProvider {
            quotes,
            fail: provider_fails,
        }),
        Duration::from_secs(2),
    );

    TestApp {
        users,
        auth,
        portfolios,
        notifier,
    }
}

fn new_portfolio(name: &str, target: Option<f64>) -> NewPortfolio {
    NewPortfolio {
        name: name.to_string(),
        target_amount: target,
        currency: Some("USD".to_string()),
    }
}

fn new_asset(symbol: &str, quantity: f64, buy_price: f64) -> NewAsset {
    NewAsset {
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        quantity,
        buy_price,
        current_price: None,
        wallet: None,
    }
}

fn assert_totals_invariant(portfolio: &Portfolio) {
    let invested: f64 = portfolio
        .assets
        .iter()
        .map(|a| a.quantity * a.buy_price)
        .sum();
    let current: f64 = portfolio
        .assets
        .iter()
        .map(|a| a.quantity * a.current_price)
        .sum();
    assert_eq!(portfolio.total_invested_value, invested);
    assert_eq!(portfolio.total_current_value, current);
}

// ── Registration & Login ────────────────────────────────────────────

#[tokio::test]
async fn register_issues_verifiable_session_token() {
    let app = setup(HashMap::new()).await;
    let session = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap();

    let user_id = auth::verify_session_token(&session.token, TEST_SECRET).unwrap();
    assert_eq!(user_id, session.user.id);
    assert_eq!(session.user.email, "alice@example.com");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = setup(HashMap::new()).await;
    app.auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap();

    let result = app
        .auth
        .register("Alice Again", "Alice@Example.com", "secret456")
        .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email_alike() {
    let app = setup(HashMap::new()).await;
    app.auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap();

    let wrong_password = app.auth.login("alice@example.com", "wrongpass").await;
    let unknown_email = app.auth.login("nobody@example.com", "secret123").await;
    assert!(matches!(wrong_password, Err(ApiError::InvalidCredentials)));
    assert!(matches!(unknown_email, Err(ApiError::InvalidCredentials)));

    let session = app.auth.login("alice@example.com", "secret123").await.unwrap();
    assert_eq!(session.user.name, "Alice");
}

// ── Portfolio & Asset CRUD ──────────────────────────────────────────

#[tokio::test]
async fn create_portfolio_and_add_asset_reference_scenario() {
    let app = setup(HashMap::new()).await;
    let user = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap()
        .user;

    let portfolio = app
        .portfolios
        .create(&user.id, new_portfolio("Main", Some(10000.0)))
        .await
        .unwrap();
    assert_eq!(portfolio.total_invested_value, 0.0);

    let portfolio = app
        .portfolios
        .add_asset(&user.id, &portfolio.id, new_asset("BTC", 0.5, 30000.0))
        .await
        .unwrap();

    assert_eq!(portfolio.total_invested_value, 15000.0);
    assert_eq!(portfolio.total_current_value, 15000.0);
    assert_eq!(portfolio.assets[0].current_price, 30000.0);

    let summary = valuation::summarize(&portfolio);
    assert_eq!(summary.valuation.profit, 0.0);
    assert_eq!(summary.target_progress, 150.0);

    // The persisted document carries the recomputed totals too.
    let stored = app.portfolios.get(&user.id, &portfolio.id).await.unwrap();
    assert_eq!(stored, portfolio);
    assert_totals_invariant(&stored);
}

#[tokio::test]
async fn asset_update_and_delete_keep_totals_consistent() {
    let app = setup(HashMap::new()).await;
    let user = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap()
        .user;
    let portfolio = app
        .portfolios
        .create(&user.id, new_portfolio("Main", None))
        .await
        .unwrap();

    let portfolio = app
        .portfolios
        .add_asset(&user.id, &portfolio.id, new_asset("BTC", 1.0, 100.0))
        .await
        .unwrap();
    let portfolio = app
        .portfolios
        .add_asset(&user.id, &portfolio.id, new_asset("ETH", 2.0, 50.0))
        .await
        .unwrap();
    assert_eq!(portfolio.total_invested_value, 200.0);

    let btc_id = portfolio.assets[0].id.clone();
    let update = AssetUpdate {
        quantity: Some(3.0),
        ..Default::default()
    };
    let portfolio = app
        .portfolios
        .update_asset(&user.id, &portfolio.id, &btc_id, update)
        .await
        .unwrap();
    assert_eq!(portfolio.total_invested_value, 400.0);
    assert_totals_invariant(&portfolio);

    let portfolio = app
        .portfolios
        .delete_asset(&user.id, &portfolio.id, &btc_id)
        .await
        .unwrap();
    assert_eq!(portfolio.assets.len(), 1);
    assert_eq!(portfolio.total_invested_value, 100.0);
    assert_totals_invariant(&portfolio);

    let missing = app
        .portfolios
        .delete_asset(&user.id, &portfolio.id, &btc_id)
        .await;
    assert!(matches!(missing, Err(ApiError::NotFound("Asset"))));
}

#[tokio::test]
async fn delete_portfolio_cascades_assets() {
    let app = setup(HashMap::new()).await;
    let user = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap()
        .user;
    let portfolio = app
        .portfolios
        .create(&user.id, new_portfolio("Main", None))
        .await
        .unwrap();
    app.portfolios
        .add_asset(&user.id, &portfolio.id, new_asset("BTC", 1.0, 100.0))
        .await
        .unwrap();

    app.portfolios.delete(&user.id, &portfolio.id).await.unwrap();

    let gone = app.portfolios.get(&user.id, &portfolio.id).await;
    assert!(matches!(gone, Err(ApiError::NotFound("Portfolio"))));
    assert!(app.portfolios.list(&user.id).await.unwrap().is_empty());
}

// ── Price Sync ──────────────────────────────────────────────────────

#[tokio::test]
async fn sync_applies_partial_quotes_and_stays_idempotent() {
    let app = setup(HashMap::from([("BTC".to_string(), 35000.0)])).await;
    let user = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap()
        .user;
    let portfolio = app
        .portfolios
        .create(&user.id, new_portfolio("Main", None))
        .await
        .unwrap();
    app.portfolios
        .add_asset(&user.id, &portfolio.id, new_asset("BTC", 0.5, 30000.0))
        .await
        .unwrap();
    app.portfolios
        .add_asset(&user.id, &portfolio.id, new_asset("ETH", 2.0, 2000.0))
        .await
        .unwrap();

    let synced = app
        .portfolios
        .sync_prices(&user.id, &portfolio.id)
        .await
        .unwrap();

    let btc = synced.assets.iter().find(|a| a.symbol == "BTC").unwrap();
    let eth = synced.assets.iter().find(|a| a.symbol == "ETH").unwrap();
    assert_eq!(btc.current_price, 35000.0);
    // No ETH quote came back; the asset is left as it was.
    assert_eq!(eth.current_price, 2000.0);
    assert_eq!(synced.total_invested_value, 19000.0);
    assert_eq!(synced.total_current_value, 21500.0);
    assert_totals_invariant(&synced);

    // Same upstream quote set, same resulting state.
    let again = app
        .portfolios
        .sync_prices(&user.id, &portfolio.id)
        .await
        .unwrap();
    assert_eq!(again.total_invested_value, synced.total_invested_value);
    assert_eq!(again.total_current_value, synced.total_current_value);
    let prices: Vec<f64> = synced.assets.iter().map(|a| a.current_price).collect();
    let prices_again: Vec<f64> = again.assets.iter().map(|a| a.current_price).collect();
    assert_eq!(prices, prices_again);
}

#[tokio::test]
async fn sync_upstream_failure_leaves_portfolio_untouched() {
    let app = setup_with(HashMap::new(), true, false).await;
    let user = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap()
        .user;
    let portfolio = app
        .portfolios
        .create(&user.id, new_portfolio("Main", None))
        .await
        .unwrap();
    app.portfolios
        .add_asset(&user.id, &portfolio.id, new_asset("BTC", 0.5, 30000.0))
        .await
        .unwrap();

    let before = app.portfolios.get(&user.id, &portfolio.id).await.unwrap();
    let result = app.portfolios.sync_prices(&user.id, &portfolio.id).await;
    assert!(matches!(result, Err(ApiError::UpstreamUnavailable(_))));

    let after = app.portfolios.get(&user.id, &portfolio.id).await.unwrap();
    assert_eq!(after, before);
}

// ── Authorization ───────────────────────────────────────────────────

#[tokio::test]
async fn foreign_portfolio_is_forbidden_not_missing() {
    let app = setup(HashMap::new()).await;
    let alice = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap()
        .user;
    let bob = app
        .auth
        .register("Bob", "bob@example.com", "secret123")
        .await
        .unwrap()
        .user;

    let portfolio = app
        .portfolios
        .create(&alice.id, new_portfolio("Main", None))
        .await
        .unwrap();

    let foreign = app.portfolios.get(&bob.id, &portfolio.id).await;
    assert!(matches!(foreign, Err(ApiError::Forbidden)));

    let foreign_mutation = app
        .portfolios
        .sync_prices(&bob.id, &portfolio.id)
        .await;
    assert!(matches!(foreign_mutation, Err(ApiError::Forbidden)));

    let missing = app.portfolios.get(&alice.id, "no-such-portfolio").await;
    assert!(matches!(missing, Err(ApiError::NotFound("Portfolio"))));
}

// ── Password Reset ──────────────────────────────────────────────────

async fn sent_reset_token(app: &TestApp) -> String {
    let sent = app.notifier.sent.lock().await;
    let (_, reset_url) = sent.last().expect("a reset link was dispatched");
    reset_url
        .rsplit('/')
        .next()
        .expect("token segment")
        .to_string()
}

#[tokio::test]
async fn reset_token_is_single_use() {
    let app = setup(HashMap::new()).await;
    app.auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap();

    app.auth.forgot_password("alice@example.com").await.unwrap();
    let token = sent_reset_token(&app).await;

    app.auth
        .reset_password(&token, "newsecret456")
        .await
        .unwrap();

    // Old credentials are gone, new ones work.
    let old = app.auth.login("alice@example.com", "secret123").await;
    assert!(matches!(old, Err(ApiError::InvalidCredentials)));
    app.auth
        .login("alice@example.com", "newsecret456")
        .await
        .unwrap();

    // Consuming the same plaintext again fails.
    let replay = app.auth.reset_password(&token, "anothersecret").await;
    assert!(matches!(replay, Err(ApiError::InvalidOrExpiredToken)));
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let app = setup(HashMap::new()).await;
    let user = app
        .auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap()
        .user;

    // Plant a token whose window has already closed.
    let (plaintext, digest) = auth::generate_reset_token();
    app.users
        .set_reset_token(&user.id, &digest, Utc::now() - ChronoDuration::minutes(1))
        .await
        .unwrap();

    let result = app.auth.reset_password(&plaintext, "newsecret456").await;
    assert!(matches!(result, Err(ApiError::InvalidOrExpiredToken)));
}

#[tokio::test]
async fn failed_send_clears_pending_reset_state() {
    let app = setup_with(HashMap::new(), false, true).await;
    app.auth
        .register("Alice", "alice@example.com", "secret123")
        .await
        .unwrap();

    let result = app.auth.forgot_password("alice@example.com").await;
    assert!(matches!(result, Err(ApiError::UpstreamUnavailable(_))));

    let record = app
        .users
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(record.reset_token_hash.is_none());
    assert!(record.reset_token_expires.is_none());
}

#[tokio::test]
async fn forgot_password_unknown_email_is_not_found() {
    let app = setup(HashMap::new()).await;
    let result = app.auth.forgot_password("nobody@example.com").await;
    assert!(matches!(result, Err(ApiError::NotFound("User"))));
}
