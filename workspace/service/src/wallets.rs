use chrono::{NaiveDate, Utc};
use model::entities::{
    transaction::{self, TransactionKind, TransactionSource},
    user,
    wallet::{self, WalletKind},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::transactions::{NewTransaction, create_transaction, create_transaction_in};

/// Currency assigned to a default wallet created on the user's behalf.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Name of the wallet created when a user has none.
pub const DEFAULT_WALLET_NAME: &str = "Wallet";

#[derive(Debug, Clone)]
pub struct NewWallet {
    pub name: String,
    pub kind: WalletKind,
    pub currency_code: String,
    pub credit_limit: Option<Decimal>,
    pub settlement_day: Option<i16>,
}

#[derive(Debug, Clone, Default)]
pub struct WalletPatch {
    pub name: Option<String>,
    pub credit_limit: Option<Option<Decimal>>,
    pub settlement_day: Option<Option<i16>>,
}

/// A balance mutation request (deposit, withdraw or adjust).
#[derive(Debug, Clone)]
pub struct BalanceMutation {
    pub amount: Decimal,
    pub occurred_on: NaiveDate,
    pub description: Option<String>,
    pub source: TransactionSource,
}

/// Both legs of a completed wallet transfer.
#[derive(Debug)]
pub struct TransferOutcome {
    pub withdrawal: transaction::Model,
    pub deposit: transaction::Model,
}

/// Adds `delta` to the wallet's balance as a single SQL column
/// expression, so concurrent mutations against the same wallet never
/// lose updates to a read-modify-write race.
pub(crate) async fn apply_balance_delta<C: ConnectionTrait>(
    conn: &C,
    wallet_id: i32,
    delta: Decimal,
) -> ServiceResult<()> {
    wallet::Entity::update_many()
        .col_expr(
            wallet::Column::Balance,
            Expr::col(wallet::Column::Balance).add(delta),
        )
        .filter(wallet::Column::Id.eq(wallet_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn create_wallet(
    db: &DatabaseConnection,
    user: &user::Model,
    input: NewWallet,
) -> ServiceResult<wallet::Model> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("wallet name must not be empty"));
    }
    if let Some(day) = input.settlement_day {
        if !(1..=31).contains(&day) {
            return Err(ServiceError::validation(
                "settlement day must be between 1 and 31",
            ));
        }
    }
    if input.kind != WalletKind::Credit
        && (input.credit_limit.is_some() || input.settlement_day.is_some())
    {
        return Err(ServiceError::validation(
            "credit limit and settlement day apply to credit wallets only",
        ));
    }

    let created = wallet::ActiveModel {
        user_id: Set(user.id),
        name: Set(input.name),
        kind: Set(input.kind),
        currency_code: Set(input.currency_code),
        balance: Set(Decimal::ZERO),
        credit_limit: Set(input.credit_limit),
        settlement_day: Set(input.settlement_day),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(wallet_id = created.id, "wallet created");
    Ok(created)
}

/// Fetches one of the user's wallets.
pub async fn get_wallet(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
) -> ServiceResult<wallet::Model> {
    wallet::Entity::find_by_id(wallet_id)
        .filter(wallet::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("wallet"))
}

pub async fn list_wallets(
    db: &DatabaseConnection,
    user: &user::Model,
) -> ServiceResult<Vec<wallet::Model>> {
    Ok(wallet::Entity::find()
        .filter(wallet::Column::UserId.eq(user.id))
        .order_by_asc(wallet::Column::Id)
        .all(db)
        .await?)
}

pub async fn update_wallet(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
    patch: WalletPatch,
) -> ServiceResult<wallet::Model> {
    let existing = get_wallet(db, user, wallet_id).await?;

    let mut active: wallet::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("wallet name must not be empty"));
        }
        active.name = Set(name);
    }
    if let Some(credit_limit) = patch.credit_limit {
        active.credit_limit = Set(credit_limit);
    }
    if let Some(settlement_day) = patch.settlement_day {
        if let Some(day) = settlement_day {
            if !(1..=31).contains(&day) {
                return Err(ServiceError::validation(
                    "settlement day must be between 1 and 31",
                ));
            }
        }
        active.settlement_day = Set(settlement_day);
    }

    Ok(active.update(db).await?)
}

/// Deletes a wallet. Its transactions keep existing with a nulled
/// wallet reference (FK SET NULL); the default-wallet pointer is a
/// weak reference and is cleared here explicitly.
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn delete_wallet(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
) -> ServiceResult<()> {
    let txn = db.begin().await?;

    let existing = wallet::Entity::find_by_id(wallet_id)
        .filter(wallet::Column::UserId.eq(user.id))
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("wallet"))?;

    user::Entity::update_many()
        .col_expr(user::Column::DefaultWalletId, Expr::value(None::<i32>))
        .filter(user::Column::DefaultWalletId.eq(wallet_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Deposits a strictly positive amount by synthesizing an Income
/// transaction against the wallet.
#[instrument(skip(db, user, input), fields(user_id = user.id))]
pub async fn deposit(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
    input: BalanceMutation,
) -> ServiceResult<transaction::Model> {
    if input.amount <= Decimal::ZERO {
        return Err(ServiceError::domain("deposit amount must be positive"));
    }
    mutate_balance(db, user, wallet_id, TransactionKind::Income, input).await
}

/// Withdraws a strictly positive amount by synthesizing an Expenditure
/// transaction against the wallet.
#[instrument(skip(db, user, input), fields(user_id = user.id))]
pub async fn withdraw(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
    input: BalanceMutation,
) -> ServiceResult<transaction::Model> {
    if input.amount <= Decimal::ZERO {
        return Err(ServiceError::domain("withdrawal amount must be positive"));
    }
    mutate_balance(db, user, wallet_id, TransactionKind::Expenditure, input).await
}

/// Adjusts a wallet by a signed, non-zero amount. The sign picks the
/// transaction direction; the stored amount is the absolute value.
#[instrument(skip(db, user, input), fields(user_id = user.id))]
pub async fn adjust(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
    input: BalanceMutation,
) -> ServiceResult<transaction::Model> {
    if input.amount.is_zero() {
        return Err(ServiceError::domain("adjustment amount must not be zero"));
    }
    let kind = if input.amount > Decimal::ZERO {
        TransactionKind::Income
    } else {
        TransactionKind::Expenditure
    };
    let input = BalanceMutation {
        amount: input.amount.abs(),
        ..input
    };
    mutate_balance(db, user, wallet_id, kind, input).await
}

async fn mutate_balance(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
    kind: TransactionKind,
    input: BalanceMutation,
) -> ServiceResult<transaction::Model> {
    create_transaction(
        db,
        user,
        NewTransaction {
            wallet_id: Some(wallet_id),
            kind,
            amount: input.amount,
            currency_code: None,
            occurred_on: input.occurred_on,
            category: None,
            description: input.description,
            line_items: None,
            source: input.source,
        },
    )
    .await
}

/// Moves an amount between two of the user's wallets. Both legs run in
/// one database transaction; a failure on either rolls back both.
#[instrument(skip(db, user, input), fields(user_id = user.id))]
pub async fn transfer(
    db: &DatabaseConnection,
    user: &user::Model,
    from_wallet_id: i32,
    to_wallet_id: i32,
    input: BalanceMutation,
) -> ServiceResult<TransferOutcome> {
    if from_wallet_id == to_wallet_id {
        return Err(ServiceError::domain(
            "transfer source and target must differ",
        ));
    }
    if input.amount <= Decimal::ZERO {
        return Err(ServiceError::domain("transfer amount must be positive"));
    }

    let txn = db.begin().await?;

    let withdrawal = create_transaction_in(
        &txn,
        user,
        NewTransaction {
            wallet_id: Some(from_wallet_id),
            kind: TransactionKind::Expenditure,
            amount: input.amount,
            currency_code: None,
            occurred_on: input.occurred_on,
            category: None,
            description: input
                .description
                .clone()
                .or_else(|| Some(format!("Transfer to wallet {to_wallet_id}"))),
            line_items: None,
            source: input.source,
        },
    )
    .await?;

    let deposit = create_transaction_in(
        &txn,
        user,
        NewTransaction {
            wallet_id: Some(to_wallet_id),
            kind: TransactionKind::Income,
            amount: input.amount,
            currency_code: None,
            occurred_on: input.occurred_on,
            category: None,
            description: input
                .description
                .or_else(|| Some(format!("Transfer from wallet {from_wallet_id}"))),
            line_items: None,
            source: input.source,
        },
    )
    .await?;

    txn.commit().await?;
    Ok(TransferOutcome {
        withdrawal,
        deposit,
    })
}

/// Persists `wallet_id` as the user's default wallet.
pub async fn set_default_wallet(
    db: &DatabaseConnection,
    user: &user::Model,
    wallet_id: i32,
) -> ServiceResult<user::Model> {
    // Ownership check doubles as existence check.
    get_wallet(db, user, wallet_id).await?;

    let mut active: user::ActiveModel = user.clone().into();
    active.default_wallet_id = Set(Some(wallet_id));
    Ok(active.update(db).await?)
}

/// Resolves the user's default wallet, deterministically picking or
/// creating one when the stored pointer is missing or stale.
pub async fn ensure_default_wallet(
    db: &DatabaseConnection,
    user: &user::Model,
) -> ServiceResult<wallet::Model> {
    let txn = db.begin().await?;
    let wallet = ensure_default_wallet_in(&txn, user).await?;
    txn.commit().await?;
    Ok(wallet)
}

/// Transaction-scoped body of [`ensure_default_wallet`].
///
/// Preference order: the persisted pointer if it still resolves to one
/// of the user's wallets, else the user's oldest Regular wallet, else
/// their oldest wallet of any kind, else a freshly created Regular
/// wallet. The winner is persisted back onto the user row.
pub(crate) async fn ensure_default_wallet_in<C: ConnectionTrait>(
    conn: &C,
    user: &user::Model,
) -> ServiceResult<wallet::Model> {
    if let Some(wallet_id) = user.default_wallet_id {
        let existing = wallet::Entity::find_by_id(wallet_id)
            .filter(wallet::Column::UserId.eq(user.id))
            .one(conn)
            .await?;
        if let Some(wallet) = existing {
            return Ok(wallet);
        }
        debug!(wallet_id, "default wallet pointer is stale");
    }

    let preferred = wallet::Entity::find()
        .filter(wallet::Column::UserId.eq(user.id))
        .filter(wallet::Column::Kind.eq(WalletKind::Regular))
        .order_by_asc(wallet::Column::Id)
        .one(conn)
        .await?;

    let fallback = match preferred {
        Some(wallet) => Some(wallet),
        None => {
            wallet::Entity::find()
                .filter(wallet::Column::UserId.eq(user.id))
                .order_by_asc(wallet::Column::Id)
                .one(conn)
                .await?
        }
    };

    let chosen = match fallback {
        Some(wallet) => wallet,
        None => {
            let created = wallet::ActiveModel {
                user_id: Set(user.id),
                name: Set(DEFAULT_WALLET_NAME.to_string()),
                kind: Set(WalletKind::Regular),
                currency_code: Set(DEFAULT_CURRENCY.to_string()),
                balance: Set(Decimal::ZERO),
                credit_limit: Set(None),
                settlement_day: Set(None),
                created_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(conn)
            .await?;
            info!(wallet_id = created.id, "created default wallet");
            created
        }
    };

    let mut active: user::ActiveModel = user.clone().into();
    active.default_wallet_id = Set(Some(chosen.id));
    active.update(conn).await?;

    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use model::entities::prelude::*;
    use rust_decimal_macros::dec;
    use sea_orm::Database;

    async fn setup() -> (DatabaseConnection, user::Model) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        Migrator::up(&db, None).await.expect("Failed to run migrations");

        let user = user::ActiveModel {
            telegram_id: Set(1000),
            display_name: Set("Tester".to_string()),
            is_active: Set(true),
            default_wallet_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to create test user");
        (db, user)
    }

    fn mutation(amount: Decimal) -> BalanceMutation {
        BalanceMutation {
            amount,
            occurred_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description: None,
            source: TransactionSource::Manual,
        }
    }

    async fn regular_wallet(db: &DatabaseConnection, user: &user::Model) -> wallet::Model {
        create_wallet(
            db,
            user,
            NewWallet {
                name: "Checking".to_string(),
                kind: WalletKind::Regular,
                currency_code: "BRL".to_string(),
                credit_limit: None,
                settlement_day: None,
            },
        )
        .await
        .expect("Failed to create wallet")
    }

    #[tokio::test]
    async fn deposit_then_withdraw_updates_balance() {
        let (db, user) = setup().await;
        let wallet = regular_wallet(&db, &user).await;

        deposit(&db, &user, wallet.id, mutation(dec!(150000.00)))
            .await
            .unwrap();
        let reloaded = get_wallet(&db, &user, wallet.id).await.unwrap();
        assert_eq!(reloaded.balance, dec!(150000.00));

        withdraw(&db, &user, wallet.id, mutation(dec!(50000.00)))
            .await
            .unwrap();
        let reloaded = get_wallet(&db, &user, wallet.id).await.unwrap();
        assert_eq!(reloaded.balance, dec!(100000.00));
    }

    #[tokio::test]
    async fn balance_is_sum_of_signed_amounts() {
        let (db, user) = setup().await;
        let wallet = regular_wallet(&db, &user).await;

        deposit(&db, &user, wallet.id, mutation(dec!(10.50))).await.unwrap();
        deposit(&db, &user, wallet.id, mutation(dec!(4.25))).await.unwrap();
        withdraw(&db, &user, wallet.id, mutation(dec!(3.00))).await.unwrap();
        adjust(&db, &user, wallet.id, mutation(dec!(-1.25))).await.unwrap();
        adjust(&db, &user, wallet.id, mutation(dec!(0.50))).await.unwrap();

        let reloaded = get_wallet(&db, &user, wallet.id).await.unwrap();
        assert_eq!(reloaded.balance, dec!(11.00));
    }

    #[tokio::test]
    async fn non_positive_mutations_are_rejected() {
        let (db, user) = setup().await;
        let wallet = regular_wallet(&db, &user).await;

        for amount in [dec!(0), dec!(-5.00)] {
            assert!(matches!(
                deposit(&db, &user, wallet.id, mutation(amount)).await,
                Err(ServiceError::Domain(_))
            ));
            assert!(matches!(
                withdraw(&db, &user, wallet.id, mutation(amount)).await,
                Err(ServiceError::Domain(_))
            ));
        }
        assert!(matches!(
            adjust(&db, &user, wallet.id, mutation(dec!(0))).await,
            Err(ServiceError::Domain(_))
        ));

        let reloaded = get_wallet(&db, &user, wallet.id).await.unwrap();
        assert_eq!(reloaded.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn adjust_maps_sign_to_direction() {
        let (db, user) = setup().await;
        let wallet = regular_wallet(&db, &user).await;

        let credit = adjust(&db, &user, wallet.id, mutation(dec!(20.00)))
            .await
            .unwrap();
        assert_eq!(credit.kind, TransactionKind::Income);
        assert_eq!(credit.amount, dec!(20.00));

        let debit = adjust(&db, &user, wallet.id, mutation(dec!(-7.50)))
            .await
            .unwrap();
        assert_eq!(debit.kind, TransactionKind::Expenditure);
        assert_eq!(debit.amount, dec!(7.50));

        let reloaded = get_wallet(&db, &user, wallet.id).await.unwrap();
        assert_eq!(reloaded.balance, dec!(12.50));
    }

    #[tokio::test]
    async fn transfer_moves_amount_between_wallets() {
        let (db, user) = setup().await;
        let source = regular_wallet(&db, &user).await;
        let target = create_wallet(
            &db,
            &user,
            NewWallet {
                name: "Savings".to_string(),
                kind: WalletKind::Investment,
                currency_code: "BRL".to_string(),
                credit_limit: None,
                settlement_day: None,
            },
        )
        .await
        .unwrap();
        deposit(&db, &user, source.id, mutation(dec!(100.00))).await.unwrap();

        let outcome = transfer(&db, &user, source.id, target.id, mutation(dec!(40.00)))
            .await
            .unwrap();
        assert_eq!(outcome.withdrawal.wallet_id, Some(source.id));
        assert_eq!(outcome.deposit.wallet_id, Some(target.id));

        let source = get_wallet(&db, &user, source.id).await.unwrap();
        let target = get_wallet(&db, &user, target.id).await.unwrap();
        assert_eq!(source.balance, dec!(60.00));
        assert_eq!(target.balance, dec!(40.00));
    }

    #[tokio::test]
    async fn failed_transfer_leaves_both_wallets_untouched() {
        let (db, user) = setup().await;
        let source = regular_wallet(&db, &user).await;
        deposit(&db, &user, source.id, mutation(dec!(100.00))).await.unwrap();

        // Second leg fails: the target wallet does not exist.
        let result = transfer(&db, &user, source.id, source.id + 999, mutation(dec!(40.00))).await;
        assert!(result.is_err());

        let source = get_wallet(&db, &user, source.id).await.unwrap();
        assert_eq!(source.balance, dec!(100.00));
        // The withdrawal leg must have been rolled back too.
        let count = Transaction::find().all(&db).await.unwrap().len();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn ensure_default_prefers_regular_wallet() {
        let (db, user) = setup().await;
        let investment = create_wallet(
            &db,
            &user,
            NewWallet {
                name: "Stocks".to_string(),
                kind: WalletKind::Investment,
                currency_code: "BRL".to_string(),
                credit_limit: None,
                settlement_day: None,
            },
        )
        .await
        .unwrap();
        let regular = regular_wallet(&db, &user).await;

        let chosen = ensure_default_wallet(&db, &user).await.unwrap();
        assert_eq!(chosen.id, regular.id);
        assert_ne!(chosen.id, investment.id);

        let persisted = User::find_by_id(user.id).one(&db).await.unwrap().unwrap();
        assert_eq!(persisted.default_wallet_id, Some(regular.id));
    }

    #[tokio::test]
    async fn ensure_default_creates_wallet_when_none_exist() {
        let (db, user) = setup().await;

        let chosen = ensure_default_wallet(&db, &user).await.unwrap();
        assert_eq!(chosen.kind, WalletKind::Regular);
        assert_eq!(chosen.name, DEFAULT_WALLET_NAME);
        assert_eq!(chosen.currency_code, DEFAULT_CURRENCY);

        let persisted = User::find_by_id(user.id).one(&db).await.unwrap().unwrap();
        assert_eq!(persisted.default_wallet_id, Some(chosen.id));
    }

    #[tokio::test]
    async fn deleting_default_wallet_clears_the_pointer() {
        let (db, user) = setup().await;
        let wallet = regular_wallet(&db, &user).await;
        let user = set_default_wallet(&db, &user, wallet.id).await.unwrap();

        delete_wallet(&db, &user, wallet.id).await.unwrap();
        let persisted = User::find_by_id(user.id).one(&db).await.unwrap().unwrap();
        assert_eq!(persisted.default_wallet_id, None);
    }
}
