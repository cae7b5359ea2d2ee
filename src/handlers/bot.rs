use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::bot::{self, TelegramUpdate};
use crate::schemas::AppState;

/// Telegram webhook endpoint.
///
/// The path segment doubles as authentication: only Telegram knows the
/// configured webhook secret, so a mismatch is answered with a bare 404
/// indistinguishable from an unknown route. Replies ride back in the
/// HTTP response body as a `sendMessage` method call.
#[instrument(skip(state, secret, update))]
pub async fn telegram_webhook(
    Path(secret): Path<String>,
    State(state): State<AppState>,
    Json(update): Json<TelegramUpdate>,
) -> Result<Json<Value>, StatusCode> {
    if secret != state.config.webhook_secret {
        warn!("webhook call with wrong secret");
        return Err(StatusCode::NOT_FOUND);
    }

    match bot::respond(&state, update).await {
        Some(reply) => Ok(Json(reply)),
        None => Ok(Json(json!({}))),
    }
}
