//! Telegram chat front end. Updates arrive on the webhook endpoint and
//! replies travel back in the webhook HTTP response, so the bot never
//! opens an outbound connection to Telegram.

pub mod commands;

use chrono::Utc;
use model::entities::{
    debt::DebtStatus,
    transaction::{TransactionKind, TransactionSource},
    user,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use service::ServiceError;
use service::transactions::NewTransaction;
use tracing::{debug, instrument, warn};

use crate::schemas::AppState;
use commands::BotCommand;

/// Incoming Telegram update, reduced to the fields the bot reads.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl TelegramUser {
    fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramChat {
    pub id: i64,
}

const USAGE: &str = "I track your money. Commands:\n\
/start - register\n\
balance - wallets and balances\n\
spent <amount> [description] - record an expense\n\
received <amount> [description] - record an income\n\
debts - open debts and next due installments\n\
help - this text";

/// Chat-facing money rendering. SQLite hands decimals back with
/// trailing zeros stripped, so force two decimal places.
fn money(amount: rust_decimal::Decimal) -> String {
    format!("{amount:.2}")
}

/// Builds the `sendMessage` call answered inline to the webhook.
fn send_message(chat_id: i64, text: String) -> Value {
    json!({
        "method": "sendMessage",
        "chat_id": chat_id,
        "text": text,
    })
}

/// Handles one update end to end. Returns `None` for updates the bot
/// has nothing to say to (no message, no sender, no text).
#[instrument(skip(state, update), fields(update_id = update.update_id))]
pub async fn respond(state: &AppState, update: TelegramUpdate) -> Option<Value> {
    let message = update.message?;
    let sender = message.from?;
    let text = message.text?;
    let chat_id = message.chat.id;

    debug!(telegram_id = sender.id, "bot message received");

    let reply = match handle(state, &sender, &text).await {
        Ok(reply) => reply,
        Err(ServiceError::Forbidden(_)) => "This account is deactivated.".to_string(),
        Err(ServiceError::Validation(msg)) | Err(ServiceError::Domain(msg)) => msg,
        Err(err) => {
            warn!(telegram_id = sender.id, "bot command failed: {err}");
            "Something went wrong, try again later.".to_string()
        }
    };

    Some(send_message(chat_id, reply))
}

async fn handle(
    state: &AppState,
    sender: &TelegramUser,
    text: &str,
) -> Result<String, ServiceError> {
    let user =
        service::users::get_or_create_by_telegram(&state.db, sender.id, sender.display_name())
            .await?;

    match BotCommand::parse(text) {
        BotCommand::Start => Ok(format!(
            "Hello {}! Your wallet is ready. Send `help` to see what I can do.",
            user.display_name
        )),
        BotCommand::Help | BotCommand::Unknown => Ok(USAGE.to_string()),
        BotCommand::Balance => balance_text(state, &user).await,
        BotCommand::Debts => debts_text(state, &user).await,
        BotCommand::Spent {
            amount,
            description,
        } => {
            let created = record(state, &user, TransactionKind::Expenditure, amount, description)
                .await?;
            Ok(format!(
                "Spent {} {} recorded.",
                money(created.amount),
                created.currency_code
            ))
        }
        BotCommand::Received {
            amount,
            description,
        } => {
            let created =
                record(state, &user, TransactionKind::Income, amount, description).await?;
            Ok(format!(
                "Received {} {} recorded.",
                money(created.amount),
                created.currency_code
            ))
        }
    }
}

async fn record(
    state: &AppState,
    user: &user::Model,
    kind: TransactionKind,
    amount: rust_decimal::Decimal,
    description: Option<String>,
) -> Result<model::entities::transaction::Model, ServiceError> {
    service::transactions::create_transaction(
        &state.db,
        user,
        NewTransaction {
            wallet_id: None,
            kind,
            amount,
            currency_code: None,
            occurred_on: Utc::now().date_naive(),
            category: None,
            description,
            line_items: None,
            source: TransactionSource::Chat,
        },
    )
    .await
}

async fn balance_text(state: &AppState, user: &user::Model) -> Result<String, ServiceError> {
    let wallets = service::wallets::list_wallets(&state.db, user).await?;
    if wallets.is_empty() {
        return Ok("No wallets yet. Record something first.".to_string());
    }
    let lines: Vec<String> = wallets
        .iter()
        .map(|w| format!("{}: {} {}", w.name, money(w.balance), w.currency_code))
        .collect();
    Ok(lines.join("\n"))
}

async fn debts_text(state: &AppState, user: &user::Model) -> Result<String, ServiceError> {
    use model::entities::installment;

    let debts = service::debts::list_debts(&state.db, user).await?;
    let open: Vec<_> = debts
        .into_iter()
        .filter(|d| d.status == DebtStatus::Active)
        .collect();
    if open.is_empty() {
        return Ok("No open debts.".to_string());
    }

    let mut lines = Vec::with_capacity(open.len());
    for debt in &open {
        let next = installment::Entity::find()
            .filter(installment::Column::DebtId.eq(debt.id))
            .filter(installment::Column::IsPaid.eq(false))
            .order_by_asc(installment::Column::Sequence)
            .one(&state.db)
            .await?;
        let label = debt
            .counterparty
            .clone()
            .or_else(|| debt.description.clone())
            .unwrap_or_else(|| format!("Debt {}", debt.id));
        match next {
            Some(inst) => lines.push(format!(
                "{label}: {} total, installment {}/{} of {} due {}",
                money(debt.principal),
                inst.sequence,
                debt.total_installments,
                money(inst.amount),
                inst.due_date
            )),
            None => lines.push(format!("{label}: {} total", money(debt.principal))),
        }
    }
    Ok(lines.join("\n"))
}
