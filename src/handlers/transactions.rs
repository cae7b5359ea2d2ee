use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use model::entities::transaction::{self, TransactionKind, TransactionSource};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::transactions::{NewTransaction, TransactionFilter, TransactionPatch};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, service_error};

/// Request body for creating a new transaction
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateTransactionRequest {
    /// Wallet to post against; omitted means the default wallet
    pub wallet_id: Option<i32>,
    /// Transaction kind: "expenditure", "income", "debt" or "receivable"
    pub kind: String,
    /// Positive amount; the balance effect is signed by kind
    pub amount: Decimal,
    /// ISO 4217 currency code; defaults to the wallet's currency
    pub currency_code: Option<String>,
    /// Effective date; defaults to today
    pub occurred_on: Option<NaiveDate>,
    /// Category label
    pub category: Option<String>,
    /// Free-form description
    pub description: Option<String>,
}

/// Request body for updating a transaction
///
/// Wallet linkage is not re-assignable; delete and recreate instead.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateTransactionRequest {
    pub kind: Option<String>,
    pub amount: Option<Decimal>,
    pub occurred_on: Option<NaiveDate>,
    /// Explicit null clears the category
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    /// Explicit null clears the description
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

fn nullable<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

/// Query parameters for listing transactions
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Restrict to one wallet
    pub wallet_id: Option<i32>,
    /// Restrict to one kind
    pub kind: Option<String>,
    /// Inclusive lower bound on the effective date
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the effective date
    pub to: Option<NaiveDate>,
}

/// Transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub user_id: i32,
    pub wallet_id: Option<i32>,
    pub kind: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub occurred_on: NaiveDate,
    pub category: Option<String>,
    pub description: Option<String>,
    pub line_items: Option<serde_json::Value>,
    pub source: String,
    pub created_at: NaiveDateTime,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            wallet_id: model.wallet_id,
            kind: transaction_kind_name(model.kind).to_string(),
            amount: model.amount,
            currency_code: model.currency_code,
            occurred_on: model.occurred_on,
            category: model.category,
            description: model.description,
            line_items: model.line_items,
            source: source_name(model.source).to_string(),
            created_at: model.created_at,
        }
    }
}

pub(crate) fn transaction_kind_name(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Expenditure => "expenditure",
        TransactionKind::Income => "income",
        TransactionKind::Debt => "debt",
        TransactionKind::Receivable => "receivable",
    }
}

pub(crate) fn parse_transaction_kind(
    value: &str,
) -> Result<TransactionKind, (StatusCode, Json<ErrorResponse>)> {
    match value.to_ascii_lowercase().as_str() {
        "expenditure" => Ok(TransactionKind::Expenditure),
        "income" => Ok(TransactionKind::Income),
        "debt" => Ok(TransactionKind::Debt),
        "receivable" => Ok(TransactionKind::Receivable),
        other => Err(service_error(service::ServiceError::validation(format!(
            "unknown transaction kind '{other}'"
        )))),
    }
}

fn source_name(source: TransactionSource) -> &'static str {
    match source {
        TransactionSource::Manual => "manual",
        TransactionSource::Chat => "chat",
        TransactionSource::ImageExtraction => "image_extraction",
    }
}

/// Create a new transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let kind = parse_transaction_kind(&request.kind)?;
    debug!(user_id = user.id, %request.amount, "creating transaction");

    let created = service::transactions::create_transaction(
        &state.db,
        &user,
        NewTransaction {
            wallet_id: request.wallet_id,
            kind,
            amount: request.amount,
            currency_code: request.currency_code,
            occurred_on: request
                .occurred_on
                .unwrap_or_else(|| Utc::now().date_naive()),
            category: request.category,
            description: request.description,
            line_items: None,
            source: TransactionSource::Manual,
        },
    )
    .await
    .map_err(service_error)?;

    info!(transaction_id = created.id, "transaction created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TransactionResponse::from(created),
            "Transaction created successfully",
        )),
    ))
}

/// Get the authenticated user's transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_transactions(
    Query(query): Query<TransactionListQuery>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let kind = match &query.kind {
        Some(value) => Some(parse_transaction_kind(value)?),
        None => None,
    };

    let transactions = service::transactions::list_transactions(
        &state.db,
        &user,
        TransactionFilter {
            wallet_id: query.wallet_id,
            kind,
            from: query.from,
            to: query.to,
        },
    )
    .await
    .map_err(service_error)?;

    let responses: Vec<TransactionResponse> = transactions
        .into_iter()
        .map(TransactionResponse::from)
        .collect();
    Ok(Json(ApiResponse::new(
        responses,
        "Transactions retrieved successfully",
    )))
}

/// Get a specific transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<TransactionResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = service::transactions::get_transaction(&state.db, &user, transaction_id)
        .await
        .map_err(service_error)?;

    Ok(Json(ApiResponse::new(
        TransactionResponse::from(found),
        "Transaction retrieved successfully",
    )))
}

/// Update a transaction
///
/// The wallet's balance is re-adjusted by the difference between the
/// old and new signed effects.
#[utoipa::path(
    put,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn update_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateTransactionRequest>,
) -> Result<Json<ApiResponse<TransactionResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let kind = match &request.kind {
        Some(value) => Some(parse_transaction_kind(value)?),
        None => None,
    };

    let updated = service::transactions::update_transaction(
        &state.db,
        &user,
        transaction_id,
        TransactionPatch {
            kind,
            amount: request.amount,
            occurred_on: request.occurred_on,
            category: request.category,
            description: request.description,
        },
    )
    .await
    .map_err(service_error)?;

    Ok(Json(ApiResponse::new(
        TransactionResponse::from(updated),
        "Transaction updated successfully",
    )))
}

/// Delete a transaction, reversing its effect on the wallet balance
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn delete_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    service::transactions::delete_transaction(&state.db, &user, transaction_id)
        .await
        .map_err(service_error)?;

    info!(transaction_id, "transaction deleted");
    Ok(Json(ApiResponse::new(
        format!("Transaction {transaction_id} deleted"),
        "Transaction deleted successfully",
    )))
}
