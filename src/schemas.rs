use axum::http::StatusCode;
use axum::response::Json;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use service::ServiceError;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

use crate::config::AppConfig;
use crate::extract::ReceiptExtractor;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Startup configuration, passed down explicitly
    pub config: AppConfig,
    /// Receipt image extraction client
    pub extractor: ReceiptExtractor,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Translates a service error into a status code and body, per the
/// error taxonomy. Database failures are logged and masked.
pub fn service_error(err: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code, message) = match &err {
        ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        ServiceError::Validation(_) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
        }
        ServiceError::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string()),
        ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
        ServiceError::Domain(_) => (StatusCode::BAD_REQUEST, "DOMAIN_ERROR", err.to_string()),
        ServiceError::Extraction(_) => {
            (StatusCode::BAD_GATEWAY, "EXTRACTION_ERROR", err.to_string())
        }
        ServiceError::Database(db_err) => {
            error!("Database error: {}", db_err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Internal server error".to_string(),
            )
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        }),
    )
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::telegram_login,
        crate::handlers::users::get_me,
        crate::handlers::users::update_me,
        crate::handlers::users::deactivate_me,
        crate::handlers::users::delete_me,
        crate::handlers::wallets::create_wallet,
        crate::handlers::wallets::get_wallets,
        crate::handlers::wallets::get_wallet,
        crate::handlers::wallets::update_wallet,
        crate::handlers::wallets::delete_wallet,
        crate::handlers::wallets::deposit,
        crate::handlers::wallets::withdraw,
        crate::handlers::wallets::adjust,
        crate::handlers::wallets::transfer,
        crate::handlers::wallets::set_default_wallet,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::update_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::debts::create_debt,
        crate::handlers::debts::get_debts,
        crate::handlers::debts::get_debt,
        crate::handlers::debts::delete_debt,
        crate::handlers::debts::get_installments,
        crate::handlers::debts::pay_installment,
        crate::handlers::debts::get_installment_payments,
        crate::handlers::receipts::upload_receipt,
    ),
    components(
        schemas(
            ApiResponse<crate::handlers::auth::TokenResponse>,
            ApiResponse<crate::handlers::users::UserResponse>,
            ApiResponse<crate::handlers::wallets::WalletResponse>,
            ApiResponse<Vec<crate::handlers::wallets::WalletResponse>>,
            ApiResponse<crate::handlers::wallets::TransferResponse>,
            ApiResponse<crate::handlers::transactions::TransactionResponse>,
            ApiResponse<Vec<crate::handlers::transactions::TransactionResponse>>,
            ApiResponse<crate::handlers::debts::DebtWithScheduleResponse>,
            ApiResponse<Vec<crate::handlers::debts::DebtResponse>>,
            ApiResponse<crate::handlers::debts::PaymentOutcomeResponse>,
            ApiResponse<crate::handlers::receipts::ReceiptUploadResponse>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::TelegramLoginRequest,
            crate::handlers::auth::TokenResponse,
            crate::handlers::users::UserResponse,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::wallets::CreateWalletRequest,
            crate::handlers::wallets::UpdateWalletRequest,
            crate::handlers::wallets::WalletResponse,
            crate::handlers::wallets::BalanceMutationRequest,
            crate::handlers::wallets::TransferRequest,
            crate::handlers::wallets::TransferResponse,
            crate::handlers::transactions::CreateTransactionRequest,
            crate::handlers::transactions::UpdateTransactionRequest,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::debts::CreateDebtRequest,
            crate::handlers::debts::DebtResponse,
            crate::handlers::debts::DebtWithScheduleResponse,
            crate::handlers::debts::PaymentOutcomeResponse,
            crate::handlers::debts::InstallmentResponse,
            crate::handlers::debts::PayInstallmentRequest,
            crate::handlers::debts::InstallmentPaymentResponse,
            crate::handlers::receipts::ReceiptUploadResponse,
            crate::extract::ReceiptData,
            crate::extract::ReceiptLineItem,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Telegram login and token issuance"),
        (name = "users", description = "Profile endpoints"),
        (name = "wallets", description = "Wallet CRUD and balance operations"),
        (name = "transactions", description = "Transaction CRUD endpoints"),
        (name = "debts", description = "Debts, installments and payments"),
        (name = "receipts", description = "Receipt image extraction"),
    ),
    info(
        title = "Moneta API",
        description = "Personal finance tracker - wallets, transactions, debts with installment schedules and a Telegram bot front end",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
