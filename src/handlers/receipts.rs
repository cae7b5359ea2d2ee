use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use model::entities::transaction::{TransactionKind, TransactionSource};
use serde::{Deserialize, Serialize};
use service::ServiceError;
use service::transactions::NewTransaction;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::extract::ReceiptData;
use crate::handlers::transactions::TransactionResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, service_error};

/// Query parameters for the receipt upload endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReceiptUploadQuery {
    /// When true, also record the extracted total as a transaction
    #[serde(default)]
    pub commit: bool,
    /// Wallet to post the committed transaction against
    pub wallet_id: Option<i32>,
}

/// Extraction result, with the recorded transaction when committed
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReceiptUploadResponse {
    pub receipt: ReceiptData,
    pub transaction: Option<TransactionResponse>,
}

/// Upload a receipt image for extraction
///
/// The image travels as a multipart field named `image`. By default the
/// endpoint only previews the extracted data; `?commit=true` also
/// records an Expenditure transaction from the extracted total.
#[utoipa::path(
    post,
    path = "/api/v1/receipts",
    tag = "receipts",
    params(ReceiptUploadQuery),
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Receipt extracted", body = ApiResponse<ReceiptUploadResponse>),
        (status = 400, description = "Missing or unreadable image", body = ErrorResponse),
        (status = 502, description = "Extraction backend failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, multipart))]
pub async fn upload_receipt(
    Query(query): Query<ReceiptUploadQuery>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ReceiptUploadResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let mut image: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| service_error(ServiceError::validation(format!("bad multipart: {err}"))))?
    {
        if field.name() == Some("image") {
            let mime = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|err| {
                service_error(ServiceError::validation(format!("unreadable image: {err}")))
            })?;
            image = Some((bytes.to_vec(), mime));
        }
    }

    let (bytes, mime) = image.ok_or_else(|| {
        service_error(ServiceError::validation("multipart field 'image' missing"))
    })?;
    if bytes.is_empty() {
        return Err(service_error(ServiceError::validation("image is empty")));
    }
    debug!(user_id = user.id, bytes = bytes.len(), "extracting receipt");

    let receipt = state
        .extractor
        .extract(&bytes, &mime)
        .await
        .map_err(service_error)?;

    let transaction = if query.commit {
        let line_items = (!receipt.line_items.is_empty())
            .then(|| serde_json::to_value(&receipt.line_items).ok())
            .flatten();
        let created = service::transactions::create_transaction(
            &state.db,
            &user,
            NewTransaction {
                wallet_id: query.wallet_id,
                kind: TransactionKind::Expenditure,
                amount: receipt.total,
                currency_code: receipt.currency_code.clone(),
                occurred_on: receipt
                    .occurred_on
                    .unwrap_or_else(|| Utc::now().date_naive()),
                category: None,
                description: receipt.merchant.clone(),
                line_items,
                source: TransactionSource::ImageExtraction,
            },
        )
        .await
        .map_err(service_error)?;
        info!(
            transaction_id = created.id,
            "receipt committed as transaction"
        );
        Some(TransactionResponse::from(created))
    } else {
        None
    };

    Ok(Json(ApiResponse::new(
        ReceiptUploadResponse {
            receipt,
            transaction,
        },
        "Receipt extracted",
    )))
}
