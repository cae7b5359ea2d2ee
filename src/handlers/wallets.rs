use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use model::entities::{
    transaction::TransactionSource,
    wallet::{self, WalletKind},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::wallets::{BalanceMutation, NewWallet, WalletPatch};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::handlers::transactions::TransactionResponse;
use crate::handlers::users::UserResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, service_error};

/// Request body for creating a new wallet
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateWalletRequest {
    /// Wallet name
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Wallet kind: "regular", "investment" or "credit"
    pub kind: Option<String>,
    /// ISO 4217 currency code (e.g., "BRL", "USD")
    #[validate(length(min = 3, max = 3))]
    pub currency_code: String,
    /// Credit limit (credit wallets only)
    pub credit_limit: Option<Decimal>,
    /// Day-of-month the credit balance is due (credit wallets only)
    #[validate(range(min = 1, max = 31))]
    pub settlement_day: Option<i16>,
}

/// Request body for updating a wallet
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateWalletRequest {
    /// Wallet name
    pub name: Option<String>,
    /// Credit limit; explicit null clears it
    #[serde(default, with = "double_option")]
    pub credit_limit: Option<Option<Decimal>>,
    /// Settlement day; explicit null clears it
    #[serde(default, with = "double_option")]
    pub settlement_day: Option<Option<i16>>,
}

/// Distinguishes an absent field from an explicit null.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }

    pub fn serialize<T, S>(value: &Option<Option<T>>, ser: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(ser),
            None => ser.serialize_none(),
        }
    }
}

/// Request body for deposit, withdraw and adjust operations
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BalanceMutationRequest {
    /// Amount; deposits and withdrawals require > 0, adjustments are signed
    pub amount: Decimal,
    /// Effective date; defaults to today
    pub occurred_on: Option<NaiveDate>,
    /// Free-form description
    pub description: Option<String>,
}

impl BalanceMutationRequest {
    fn into_mutation(self) -> BalanceMutation {
        BalanceMutation {
            amount: self.amount,
            occurred_on: self.occurred_on.unwrap_or_else(today),
            description: self.description,
            source: TransactionSource::Manual,
        }
    }
}

/// Request body for transferring between two wallets
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TransferRequest {
    /// Source wallet ID
    pub from_wallet_id: i32,
    /// Target wallet ID
    pub to_wallet_id: i32,
    /// Amount to move, must be > 0
    pub amount: Decimal,
    /// Effective date; defaults to today
    pub occurred_on: Option<NaiveDate>,
    /// Free-form description applied to both legs
    pub description: Option<String>,
}

/// Both legs of a completed transfer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub withdrawal: TransactionResponse,
    pub deposit: TransactionResponse,
}

/// Wallet response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub kind: String,
    pub currency_code: String,
    pub balance: Decimal,
    pub credit_limit: Option<Decimal>,
    pub settlement_day: Option<i16>,
}

impl From<wallet::Model> for WalletResponse {
    fn from(model: wallet::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            kind: wallet_kind_name(model.kind).to_string(),
            currency_code: model.currency_code,
            balance: model.balance,
            credit_limit: model.credit_limit,
            settlement_day: model.settlement_day,
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn wallet_kind_name(kind: WalletKind) -> &'static str {
    match kind {
        WalletKind::Regular => "regular",
        WalletKind::Investment => "investment",
        WalletKind::Credit => "credit",
    }
}

fn parse_wallet_kind(value: &str) -> Result<WalletKind, (StatusCode, Json<ErrorResponse>)> {
    match value.to_ascii_lowercase().as_str() {
        "regular" => Ok(WalletKind::Regular),
        "investment" => Ok(WalletKind::Investment),
        "credit" => Ok(WalletKind::Credit),
        other => Err(service_error(service::ServiceError::validation(format!(
            "unknown wallet kind '{other}'"
        )))),
    }
}

/// Create a new wallet
#[utoipa::path(
    post,
    path = "/api/v1/wallets",
    tag = "wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created successfully", body = ApiResponse<WalletResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn create_wallet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WalletResponse>>), (StatusCode, Json<ErrorResponse>)> {
    if let Err(errors) = request.validate() {
        return Err(service_error(service::ServiceError::Validation(
            errors.to_string(),
        )));
    }
    debug!(user_id = user.id, name = %request.name, "creating wallet");

    let kind = match &request.kind {
        Some(value) => parse_wallet_kind(value)?,
        None => WalletKind::Regular,
    };

    let created = service::wallets::create_wallet(
        &state.db,
        &user,
        NewWallet {
            name: request.name,
            kind,
            currency_code: request.currency_code.to_ascii_uppercase(),
            credit_limit: request.credit_limit,
            settlement_day: request.settlement_day,
        },
    )
    .await
    .map_err(service_error)?;

    info!(wallet_id = created.id, "wallet created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            WalletResponse::from(created),
            "Wallet created successfully",
        )),
    ))
}

/// Get all wallets owned by the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/wallets",
    tag = "wallets",
    responses(
        (status = 200, description = "Wallets retrieved successfully", body = ApiResponse<Vec<WalletResponse>>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_wallets(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<WalletResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let wallets = service::wallets::list_wallets(&state.db, &user)
        .await
        .map_err(service_error)?;

    let responses: Vec<WalletResponse> = wallets.into_iter().map(WalletResponse::from).collect();
    Ok(Json(ApiResponse::new(
        responses,
        "Wallets retrieved successfully",
    )))
}

/// Get a specific wallet by ID
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{wallet_id}",
    tag = "wallets",
    params(
        ("wallet_id" = i32, Path, description = "Wallet ID"),
    ),
    responses(
        (status = 200, description = "Wallet retrieved successfully", body = ApiResponse<WalletResponse>),
        (status = 404, description = "Wallet not found", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_wallet(
    Path(wallet_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<WalletResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = service::wallets::get_wallet(&state.db, &user, wallet_id)
        .await
        .map_err(service_error)?;

    Ok(Json(ApiResponse::new(
        WalletResponse::from(found),
        "Wallet retrieved successfully",
    )))
}

/// Update a wallet
#[utoipa::path(
    put,
    path = "/api/v1/wallets/{wallet_id}",
    tag = "wallets",
    params(
        ("wallet_id" = i32, Path, description = "Wallet ID"),
    ),
    request_body = UpdateWalletRequest,
    responses(
        (status = 200, description = "Wallet updated successfully", body = ApiResponse<WalletResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn update_wallet(
    Path(wallet_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateWalletRequest>,
) -> Result<Json<ApiResponse<WalletResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let updated = service::wallets::update_wallet(
        &state.db,
        &user,
        wallet_id,
        WalletPatch {
            name: request.name,
            credit_limit: request.credit_limit,
            settlement_day: request.settlement_day,
        },
    )
    .await
    .map_err(service_error)?;

    Ok(Json(ApiResponse::new(
        WalletResponse::from(updated),
        "Wallet updated successfully",
    )))
}

/// Delete a wallet
///
/// Transactions posted against the wallet survive with a nulled wallet
/// reference; the default-wallet pointer is cleared when it pointed here.
#[utoipa::path(
    delete,
    path = "/api/v1/wallets/{wallet_id}",
    tag = "wallets",
    params(
        ("wallet_id" = i32, Path, description = "Wallet ID"),
    ),
    responses(
        (status = 200, description = "Wallet deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn delete_wallet(
    Path(wallet_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    service::wallets::delete_wallet(&state.db, &user, wallet_id)
        .await
        .map_err(service_error)?;

    info!(wallet_id, "wallet deleted");
    Ok(Json(ApiResponse::new(
        format!("Wallet {wallet_id} deleted"),
        "Wallet deleted successfully",
    )))
}

/// Deposit into a wallet
#[utoipa::path(
    post,
    path = "/api/v1/wallets/{wallet_id}/deposit",
    tag = "wallets",
    params(
        ("wallet_id" = i32, Path, description = "Wallet ID"),
    ),
    request_body = BalanceMutationRequest,
    responses(
        (status = 201, description = "Deposit recorded", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn deposit(
    Path(wallet_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<BalanceMutationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let created = service::wallets::deposit(&state.db, &user, wallet_id, request.into_mutation())
        .await
        .map_err(service_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TransactionResponse::from(created),
            "Deposit recorded",
        )),
    ))
}

/// Withdraw from a wallet
#[utoipa::path(
    post,
    path = "/api/v1/wallets/{wallet_id}/withdraw",
    tag = "wallets",
    params(
        ("wallet_id" = i32, Path, description = "Wallet ID"),
    ),
    request_body = BalanceMutationRequest,
    responses(
        (status = 201, description = "Withdrawal recorded", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn withdraw(
    Path(wallet_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<BalanceMutationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let created = service::wallets::withdraw(&state.db, &user, wallet_id, request.into_mutation())
        .await
        .map_err(service_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TransactionResponse::from(created),
            "Withdrawal recorded",
        )),
    ))
}

/// Adjust a wallet by a signed amount
#[utoipa::path(
    post,
    path = "/api/v1/wallets/{wallet_id}/adjust",
    tag = "wallets",
    params(
        ("wallet_id" = i32, Path, description = "Wallet ID"),
    ),
    request_body = BalanceMutationRequest,
    responses(
        (status = 201, description = "Adjustment recorded", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn adjust(
    Path(wallet_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<BalanceMutationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let created = service::wallets::adjust(&state.db, &user, wallet_id, request.into_mutation())
        .await
        .map_err(service_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TransactionResponse::from(created),
            "Adjustment recorded",
        )),
    ))
}

/// Transfer between two wallets
#[utoipa::path(
    post,
    path = "/api/v1/wallets/transfer",
    tag = "wallets",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer completed", body = ApiResponse<TransferResponse>),
        (status = 400, description = "Invalid transfer", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn transfer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferResponse>>), (StatusCode, Json<ErrorResponse>)> {
    let outcome = service::wallets::transfer(
        &state.db,
        &user,
        request.from_wallet_id,
        request.to_wallet_id,
        BalanceMutation {
            amount: request.amount,
            occurred_on: request.occurred_on.unwrap_or_else(today),
            description: request.description,
            source: TransactionSource::Manual,
        },
    )
    .await
    .map_err(service_error)?;

    info!(
        from = request.from_wallet_id,
        to = request.to_wallet_id,
        "transfer completed"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TransferResponse {
                withdrawal: TransactionResponse::from(outcome.withdrawal),
                deposit: TransactionResponse::from(outcome.deposit),
            },
            "Transfer completed",
        )),
    ))
}

/// Mark a wallet as the user's default
#[utoipa::path(
    post,
    path = "/api/v1/wallets/{wallet_id}/default",
    tag = "wallets",
    params(
        ("wallet_id" = i32, Path, description = "Wallet ID"),
    ),
    responses(
        (status = 200, description = "Default wallet set", body = ApiResponse<UserResponse>),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn set_default_wallet(
    Path(wallet_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let updated = service::wallets::set_default_wallet(&state.db, &user, wallet_id)
        .await
        .map_err(service_error)?;

    Ok(Json(ApiResponse::new(
        UserResponse::from(updated),
        "Default wallet set",
    )))
}
