use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use model::entities::{
    debt::{self, DebtStatus},
    installment, installment_payment,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::debts::{InstallmentPaymentInput, NewDebt};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, service_error};

/// Request body for creating a new debt with its installment schedule
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateDebtRequest {
    /// Wallet the debt is tracked against; optional
    pub wallet_id: Option<i32>,
    /// Who the money is owed to
    pub counterparty: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Total amount owed, > 0 with at most two decimal places
    pub principal: Decimal,
    /// Number of installments
    #[validate(range(min = 1, max = 240))]
    pub total_installments: i32,
    /// Due date of the first installment
    pub start_date: NaiveDate,
    /// Months between consecutive installments (default 1)
    #[validate(range(min = 1, max = 12))]
    pub month_interval: Option<i32>,
    /// Nominal interest rate, stored for reference only
    pub interest_rate: Option<Decimal>,
}

/// Request body for paying an installment
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PayInstallmentRequest {
    /// Amount to apply; omitted pays the outstanding remainder
    pub amount: Option<Decimal>,
    /// Payment date; defaults to today
    pub paid_on: Option<NaiveDate>,
    /// Settling transaction reference
    pub transaction_id: Option<i32>,
}

/// Debt response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DebtResponse {
    pub id: i32,
    pub user_id: i32,
    pub wallet_id: Option<i32>,
    pub counterparty: Option<String>,
    pub description: Option<String>,
    pub principal: Decimal,
    pub total_installments: i32,
    pub start_date: NaiveDate,
    pub month_interval: i32,
    pub interest_rate: Option<Decimal>,
    pub status: String,
}

impl From<debt::Model> for DebtResponse {
    fn from(model: debt::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            wallet_id: model.wallet_id,
            counterparty: model.counterparty,
            description: model.description,
            principal: model.principal,
            total_installments: model.total_installments,
            start_date: model.start_date,
            month_interval: model.month_interval,
            interest_rate: model.interest_rate,
            status: match model.status {
                DebtStatus::Active => "active".to_string(),
                DebtStatus::Closed => "closed".to_string(),
            },
        }
    }
}

/// Installment response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InstallmentResponse {
    pub id: i32,
    pub debt_id: i32,
    pub sequence: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<NaiveDate>,
    pub transaction_id: Option<i32>,
}

impl From<installment::Model> for InstallmentResponse {
    fn from(model: installment::Model) -> Self {
        Self {
            id: model.id,
            debt_id: model.debt_id,
            sequence: model.sequence,
            due_date: model.due_date,
            amount: model.amount,
            paid_amount: model.paid_amount,
            is_paid: model.is_paid,
            paid_at: model.paid_at,
            transaction_id: model.transaction_id,
        }
    }
}

/// One row of an installment's payment ledger
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InstallmentPaymentResponse {
    pub id: i32,
    pub installment_id: i32,
    pub amount: Decimal,
    pub paid_on: NaiveDate,
    pub transaction_id: Option<i32>,
}

impl From<installment_payment::Model> for InstallmentPaymentResponse {
    fn from(model: installment_payment::Model) -> Self {
        Self {
            id: model.id,
            installment_id: model.installment_id,
            amount: model.amount,
            paid_on: model.paid_on,
            transaction_id: model.transaction_id,
        }
    }
}

/// A debt together with its full schedule
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DebtWithScheduleResponse {
    pub debt: DebtResponse,
    pub installments: Vec<InstallmentResponse>,
}

/// The payment outcome returned by the pay endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentOutcomeResponse {
    pub installment: InstallmentResponse,
    pub payment: InstallmentPaymentResponse,
    /// True when this payment settled the debt's last open installment
    pub debt_closed: bool,
}

/// Create a new debt
///
/// Generates the full installment schedule up front; the amounts sum
/// exactly to the principal.
#[utoipa::path(
    post,
    path = "/api/v1/debts",
    tag = "debts",
    request_body = CreateDebtRequest,
    responses(
        (status = 201, description = "Debt created successfully", body = ApiResponse<DebtWithScheduleResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn create_debt(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateDebtRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DebtWithScheduleResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    if let Err(errors) = request.validate() {
        return Err(service_error(service::ServiceError::Validation(
            errors.to_string(),
        )));
    }

    let (created, installments) = service::debts::create_debt(
        &state.db,
        &user,
        NewDebt {
            wallet_id: request.wallet_id,
            counterparty: request.counterparty,
            description: request.description,
            principal: request.principal,
            total_installments: request.total_installments,
            start_date: request.start_date,
            month_interval: request.month_interval.unwrap_or(1),
            interest_rate: request.interest_rate,
        },
    )
    .await
    .map_err(service_error)?;

    info!(debt_id = created.id, "debt created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            DebtWithScheduleResponse {
                debt: DebtResponse::from(created),
                installments: installments
                    .into_iter()
                    .map(InstallmentResponse::from)
                    .collect(),
            },
            "Debt created successfully",
        )),
    ))
}

/// Get all debts owned by the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/debts",
    tag = "debts",
    responses(
        (status = 200, description = "Debts retrieved successfully", body = ApiResponse<Vec<DebtResponse>>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_debts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<DebtResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let debts = service::debts::list_debts(&state.db, &user)
        .await
        .map_err(service_error)?;

    let responses: Vec<DebtResponse> = debts.into_iter().map(DebtResponse::from).collect();
    Ok(Json(ApiResponse::new(
        responses,
        "Debts retrieved successfully",
    )))
}

/// Get a specific debt by ID
#[utoipa::path(
    get,
    path = "/api/v1/debts/{debt_id}",
    tag = "debts",
    params(
        ("debt_id" = i32, Path, description = "Debt ID"),
    ),
    responses(
        (status = 200, description = "Debt retrieved successfully", body = ApiResponse<DebtResponse>),
        (status = 404, description = "Debt not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_debt(
    Path(debt_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<DebtResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = service::debts::get_debt(&state.db, &user, debt_id)
        .await
        .map_err(service_error)?;

    Ok(Json(ApiResponse::new(
        DebtResponse::from(found),
        "Debt retrieved successfully",
    )))
}

/// Delete a debt and its installment schedule
#[utoipa::path(
    delete,
    path = "/api/v1/debts/{debt_id}",
    tag = "debts",
    params(
        ("debt_id" = i32, Path, description = "Debt ID"),
    ),
    responses(
        (status = 200, description = "Debt deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Debt not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn delete_debt(
    Path(debt_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    service::debts::delete_debt(&state.db, &user, debt_id)
        .await
        .map_err(service_error)?;

    info!(debt_id, "debt deleted");
    Ok(Json(ApiResponse::new(
        format!("Debt {debt_id} deleted"),
        "Debt deleted successfully",
    )))
}

/// Get a debt's installments in schedule order
#[utoipa::path(
    get,
    path = "/api/v1/debts/{debt_id}/installments",
    tag = "debts",
    params(
        ("debt_id" = i32, Path, description = "Debt ID"),
    ),
    responses(
        (status = 200, description = "Installments retrieved successfully", body = ApiResponse<Vec<InstallmentResponse>>),
        (status = 404, description = "Debt not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_installments(
    Path(debt_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<InstallmentResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let installments = service::debts::list_installments(&state.db, &user, debt_id)
        .await
        .map_err(service_error)?;

    let responses: Vec<InstallmentResponse> = installments
        .into_iter()
        .map(InstallmentResponse::from)
        .collect();
    Ok(Json(ApiResponse::new(
        responses,
        "Installments retrieved successfully",
    )))
}

/// Apply a payment to an installment
///
/// Partial payments accumulate; overpayment is capped at the
/// outstanding remainder. Settling the last open installment closes
/// the debt.
#[utoipa::path(
    post,
    path = "/api/v1/installments/{installment_id}/payments",
    tag = "debts",
    params(
        ("installment_id" = i32, Path, description = "Installment ID"),
    ),
    request_body = PayInstallmentRequest,
    responses(
        (status = 201, description = "Payment applied", body = ApiResponse<PaymentOutcomeResponse>),
        (status = 400, description = "Invalid payment", body = ErrorResponse),
        (status = 404, description = "Installment not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn pay_installment(
    Path(installment_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<PayInstallmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentOutcomeResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let outcome = service::debts::pay_installment(
        &state.db,
        &user,
        installment_id,
        InstallmentPaymentInput {
            amount: request.amount,
            paid_on: request.paid_on.unwrap_or_else(|| Utc::now().date_naive()),
            transaction_id: request.transaction_id,
        },
    )
    .await
    .map_err(service_error)?;

    info!(
        installment_id,
        debt_closed = outcome.debt_closed,
        "payment applied"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            PaymentOutcomeResponse {
                installment: InstallmentResponse::from(outcome.installment),
                payment: InstallmentPaymentResponse::from(outcome.payment),
                debt_closed: outcome.debt_closed,
            },
            "Payment applied",
        )),
    ))
}

/// Get an installment's payment ledger
#[utoipa::path(
    get,
    path = "/api/v1/installments/{installment_id}/payments",
    tag = "debts",
    params(
        ("installment_id" = i32, Path, description = "Installment ID"),
    ),
    responses(
        (status = 200, description = "Payments retrieved successfully", body = ApiResponse<Vec<InstallmentPaymentResponse>>),
        (status = 404, description = "Installment not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_installment_payments(
    Path(installment_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<InstallmentPaymentResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let payments = service::debts::list_payments(&state.db, &user, installment_id)
        .await
        .map_err(service_error)?;

    let responses: Vec<InstallmentPaymentResponse> = payments
        .into_iter()
        .map(InstallmentPaymentResponse::from)
        .collect();
    Ok(Json(ApiResponse::new(
        responses,
        "Payments retrieved successfully",
    )))
}
