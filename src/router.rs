use crate::handlers::{
    auth::telegram_login,
    bot::telegram_webhook,
    debts::{
        create_debt, delete_debt, get_debt, get_debts, get_installment_payments, get_installments,
        pay_installment,
    },
    health::health_check,
    receipts::upload_receipt,
    transactions::{
        create_transaction, delete_transaction, get_transaction, get_transactions,
        update_transaction,
    },
    users::{deactivate_me, delete_me, get_me, update_me},
    wallets::{
        adjust, create_wallet, delete_wallet, deposit, get_wallet, get_wallets,
        set_default_wallet, transfer, update_wallet, withdraw,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Login
        .route("/api/v1/auth/telegram", post(telegram_login))
        // Profile routes
        .route("/api/v1/users/me", get(get_me))
        .route("/api/v1/users/me", put(update_me))
        .route("/api/v1/users/me", delete(delete_me))
        .route("/api/v1/users/me/deactivate", post(deactivate_me))
        // Wallet CRUD routes
        .route("/api/v1/wallets", post(create_wallet))
        .route("/api/v1/wallets", get(get_wallets))
        .route("/api/v1/wallets/transfer", post(transfer))
        .route("/api/v1/wallets/:wallet_id", get(get_wallet))
        .route("/api/v1/wallets/:wallet_id", put(update_wallet))
        .route("/api/v1/wallets/:wallet_id", delete(delete_wallet))
        // Wallet balance operations
        .route("/api/v1/wallets/:wallet_id/deposit", post(deposit))
        .route("/api/v1/wallets/:wallet_id/withdraw", post(withdraw))
        .route("/api/v1/wallets/:wallet_id/adjust", post(adjust))
        .route("/api/v1/wallets/:wallet_id/default", post(set_default_wallet))
        // Transaction CRUD routes
        .route("/api/v1/transactions", post(create_transaction))
        .route("/api/v1/transactions", get(get_transactions))
        .route("/api/v1/transactions/:transaction_id", get(get_transaction))
        .route("/api/v1/transactions/:transaction_id", put(update_transaction))
        .route("/api/v1/transactions/:transaction_id", delete(delete_transaction))
        // Debt and installment routes
        .route("/api/v1/debts", post(create_debt))
        .route("/api/v1/debts", get(get_debts))
        .route("/api/v1/debts/:debt_id", get(get_debt))
        .route("/api/v1/debts/:debt_id", delete(delete_debt))
        .route("/api/v1/debts/:debt_id/installments", get(get_installments))
        .route(
            "/api/v1/installments/:installment_id/payments",
            post(pay_installment),
        )
        .route(
            "/api/v1/installments/:installment_id/payments",
            get(get_installment_payments),
        )
        // Receipt extraction
        .route("/api/v1/receipts", post(upload_receipt))
        // Telegram webhook
        .route("/bot/:secret/webhook", post(telegram_webhook))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
