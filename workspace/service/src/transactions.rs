use chrono::{NaiveDate, Utc};
use model::entities::{
    transaction::{self, TransactionKind, TransactionSource},
    user, wallet,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::schedule::quantize;
use crate::wallets;

/// Input for creating a transaction. `amount` is always positive; the
/// balance effect on the linked wallet is signed by `kind`.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Explicit wallet; when `None` the user's default wallet is
    /// resolved (and created if need be).
    pub wallet_id: Option<i32>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    /// Defaults to the wallet's currency.
    pub currency_code: Option<String>,
    pub occurred_on: NaiveDate,
    pub category: Option<String>,
    pub description: Option<String>,
    pub line_items: Option<serde_json::Value>,
    pub source: TransactionSource,
}

/// Patch for the explicit update path. Wallet linkage is not
/// re-assignable; the original stays.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub amount: Option<Decimal>,
    pub occurred_on: Option<NaiveDate>,
    pub category: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

/// Query filters for listing a user's transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub wallet_id: Option<i32>,
    pub kind: Option<TransactionKind>,
    /// Inclusive lower bound on `occurred_on`.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `occurred_on`.
    pub to: Option<NaiveDate>,
}

/// The balance effect of a transaction on its wallet. Income and Debt
/// bring cash in (borrowing credits the wallet); Expenditure and
/// Receivable take cash out (lending debits it).
pub fn signed_amount(kind: TransactionKind, amount: Decimal) -> Decimal {
    match kind {
        TransactionKind::Income | TransactionKind::Debt => amount,
        TransactionKind::Expenditure | TransactionKind::Receivable => -amount,
    }
}

/// Creates a transaction and applies its signed amount to the linked
/// wallet inside one database transaction.
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    user: &user::Model,
    input: NewTransaction,
) -> ServiceResult<transaction::Model> {
    let txn = db.begin().await?;
    let created = create_transaction_in(&txn, user, input).await?;
    txn.commit().await?;
    Ok(created)
}

/// Transaction-scoped body of [`create_transaction`], composable into
/// larger units of work (wallet transfers, receipt commits).
pub(crate) async fn create_transaction_in<C: ConnectionTrait>(
    conn: &C,
    user: &user::Model,
    input: NewTransaction,
) -> ServiceResult<transaction::Model> {
    let amount = quantize(input.amount);
    if amount <= Decimal::ZERO {
        return Err(ServiceError::validation("amount must be positive"));
    }

    let wallet = match input.wallet_id {
        Some(wallet_id) => {
            let wallet = wallet::Entity::find_by_id(wallet_id)
                .one(conn)
                .await?
                .ok_or(ServiceError::NotFound("wallet"))?;
            if wallet.user_id != user.id {
                return Err(ServiceError::domain("wallet does not belong to the user"));
            }
            wallet
        }
        None => wallets::ensure_default_wallet_in(conn, user).await?,
    };

    let currency_code = input
        .currency_code
        .unwrap_or_else(|| wallet.currency_code.clone());

    let created = transaction::ActiveModel {
        user_id: Set(user.id),
        wallet_id: Set(Some(wallet.id)),
        kind: Set(input.kind),
        amount: Set(amount),
        currency_code: Set(currency_code),
        occurred_on: Set(input.occurred_on),
        category: Set(input.category),
        description: Set(input.description),
        line_items: Set(input.line_items),
        source: Set(input.source),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    wallets::apply_balance_delta(conn, wallet.id, signed_amount(created.kind, created.amount))
        .await?;

    debug!(
        transaction_id = created.id,
        wallet_id = wallet.id,
        "transaction created"
    );
    Ok(created)
}

/// Fetches one of the user's transactions.
pub async fn get_transaction(
    db: &DatabaseConnection,
    user: &user::Model,
    transaction_id: i32,
) -> ServiceResult<transaction::Model> {
    transaction::Entity::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("transaction"))
}

/// Lists the user's transactions, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    user: &user::Model,
    filter: TransactionFilter,
) -> ServiceResult<Vec<transaction::Model>> {
    let mut query =
        transaction::Entity::find().filter(transaction::Column::UserId.eq(user.id));

    if let Some(wallet_id) = filter.wallet_id {
        query = query.filter(transaction::Column::WalletId.eq(wallet_id));
    }
    if let Some(kind) = filter.kind {
        query = query.filter(transaction::Column::Kind.eq(kind));
    }
    if let Some(from) = filter.from {
        query = query.filter(transaction::Column::OccurredOn.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(transaction::Column::OccurredOn.lte(to));
    }

    Ok(query
        .order_by_desc(transaction::Column::OccurredOn)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await?)
}

/// Applies the explicit update path: the old signed effect is reversed
/// and the new one applied, keeping the wallet-balance invariant.
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    user: &user::Model,
    transaction_id: i32,
    patch: TransactionPatch,
) -> ServiceResult<transaction::Model> {
    let txn = db.begin().await?;

    let existing = transaction::Entity::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user.id))
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("transaction"))?;

    let old_effect = signed_amount(existing.kind, existing.amount);
    let wallet_id = existing.wallet_id;

    let mut active: transaction::ActiveModel = existing.into();
    if let Some(kind) = patch.kind {
        active.kind = Set(kind);
    }
    if let Some(amount) = patch.amount {
        let amount = quantize(amount);
        if amount <= Decimal::ZERO {
            return Err(ServiceError::validation("amount must be positive"));
        }
        active.amount = Set(amount);
    }
    if let Some(occurred_on) = patch.occurred_on {
        active.occurred_on = Set(occurred_on);
    }
    if let Some(category) = patch.category {
        active.category = Set(category);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }

    let updated = active.update(&txn).await?;

    if let Some(wallet_id) = wallet_id {
        let new_effect = signed_amount(updated.kind, updated.amount);
        wallets::apply_balance_delta(&txn, wallet_id, new_effect - old_effect).await?;
    }

    txn.commit().await?;
    Ok(updated)
}

/// Deletes a transaction, reversing its balance effect on the wallet.
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    user: &user::Model,
    transaction_id: i32,
) -> ServiceResult<()> {
    let txn = db.begin().await?;

    let existing = transaction::Entity::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user.id))
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("transaction"))?;

    if let Some(wallet_id) = existing.wallet_id {
        wallets::apply_balance_delta(
            &txn,
            wallet_id,
            -signed_amount(existing.kind, existing.amount),
        )
        .await?;
    }
    existing.delete(&txn).await?;

    txn.commit().await?;
    Ok(())
}
