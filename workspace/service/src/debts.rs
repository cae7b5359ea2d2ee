use chrono::{NaiveDate, Utc};
use model::entities::{
    debt::{self, DebtStatus},
    installment, installment_payment,
    transaction,
    user, wallet,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::schedule::{build_schedule, quantize};

#[derive(Debug, Clone)]
pub struct NewDebt {
    pub wallet_id: Option<i32>,
    pub counterparty: Option<String>,
    pub description: Option<String>,
    pub principal: Decimal,
    pub total_installments: i32,
    pub start_date: NaiveDate,
    pub month_interval: i32,
    /// Stored for reference; not amortized into the schedule.
    pub interest_rate: Option<Decimal>,
}

/// Input for applying a payment to an installment.
#[derive(Debug, Clone)]
pub struct InstallmentPaymentInput {
    /// Defaults to the installment's outstanding amount.
    pub amount: Option<Decimal>,
    pub paid_on: NaiveDate,
    /// Optional settling transaction.
    pub transaction_id: Option<i32>,
}

/// Result of one payment application.
#[derive(Debug)]
pub struct PaymentOutcome {
    pub installment: installment::Model,
    pub payment: installment_payment::Model,
    /// True when this payment settled the debt's last open installment.
    pub debt_closed: bool,
}

/// Creates a debt and its full installment schedule in one database
/// transaction.
#[instrument(skip(db, user, input), fields(user_id = user.id))]
pub async fn create_debt(
    db: &DatabaseConnection,
    user: &user::Model,
    input: NewDebt,
) -> ServiceResult<(debt::Model, Vec<installment::Model>)> {
    let schedule = build_schedule(
        input.principal,
        input.total_installments,
        input.start_date,
        input.month_interval,
    )?;

    let txn = db.begin().await?;

    if let Some(wallet_id) = input.wallet_id {
        let owned = wallet::Entity::find_by_id(wallet_id)
            .filter(wallet::Column::UserId.eq(user.id))
            .one(&txn)
            .await?;
        if owned.is_none() {
            return Err(ServiceError::domain("wallet does not belong to the user"));
        }
    }

    let created = debt::ActiveModel {
        user_id: Set(user.id),
        wallet_id: Set(input.wallet_id),
        counterparty: Set(input.counterparty),
        description: Set(input.description),
        principal: Set(input.principal),
        total_installments: Set(input.total_installments),
        start_date: Set(input.start_date),
        month_interval: Set(input.month_interval),
        interest_rate: Set(input.interest_rate),
        status: Set(DebtStatus::Active),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    installment::Entity::insert_many(schedule.into_iter().map(|entry| {
        installment::ActiveModel {
            debt_id: Set(created.id),
            sequence: Set(entry.sequence),
            due_date: Set(entry.due_date),
            amount: Set(entry.amount),
            paid_amount: Set(Decimal::ZERO),
            is_paid: Set(false),
            paid_at: Set(None),
            transaction_id: Set(None),
            ..Default::default()
        }
    }))
    .exec(&txn)
    .await?;

    let installments = installments_of(&txn, created.id).await?;

    txn.commit().await?;
    info!(
        debt_id = created.id,
        installments = installments.len(),
        "debt created"
    );
    Ok((created, installments))
}

/// Fetches one of the user's debts.
pub async fn get_debt(
    db: &DatabaseConnection,
    user: &user::Model,
    debt_id: i32,
) -> ServiceResult<debt::Model> {
    debt::Entity::find_by_id(debt_id)
        .filter(debt::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("debt"))
}

pub async fn list_debts(
    db: &DatabaseConnection,
    user: &user::Model,
) -> ServiceResult<Vec<debt::Model>> {
    Ok(debt::Entity::find()
        .filter(debt::Column::UserId.eq(user.id))
        .order_by_asc(debt::Column::Id)
        .all(db)
        .await?)
}

/// Deletes a debt; installments and their payment ledger cascade.
pub async fn delete_debt(
    db: &DatabaseConnection,
    user: &user::Model,
    debt_id: i32,
) -> ServiceResult<()> {
    let existing = get_debt(db, user, debt_id).await?;
    existing.delete(db).await?;
    Ok(())
}

/// Lists a debt's installments in schedule order.
pub async fn list_installments(
    db: &DatabaseConnection,
    user: &user::Model,
    debt_id: i32,
) -> ServiceResult<Vec<installment::Model>> {
    get_debt(db, user, debt_id).await?;
    installments_of(db, debt_id).await
}

async fn installments_of<C: ConnectionTrait>(
    conn: &C,
    debt_id: i32,
) -> ServiceResult<Vec<installment::Model>> {
    Ok(installment::Entity::find()
        .filter(installment::Column::DebtId.eq(debt_id))
        .order_by_asc(installment::Column::Sequence)
        .all(conn)
        .await?)
}

/// Lists the append-only payment ledger of one installment.
pub async fn list_payments(
    db: &DatabaseConnection,
    user: &user::Model,
    installment_id: i32,
) -> ServiceResult<Vec<installment_payment::Model>> {
    load_installment(db, user, installment_id).await?;
    Ok(installment_payment::Entity::find()
        .filter(installment_payment::Column::InstallmentId.eq(installment_id))
        .order_by_asc(installment_payment::Column::Id)
        .all(db)
        .await?)
}

async fn load_installment<C: ConnectionTrait>(
    conn: &C,
    user: &user::Model,
    installment_id: i32,
) -> ServiceResult<(installment::Model, debt::Model)> {
    let installment = installment::Entity::find_by_id(installment_id)
        .one(conn)
        .await?
        .ok_or(ServiceError::NotFound("installment"))?;
    let parent = debt::Entity::find_by_id(installment.debt_id)
        .filter(debt::Column::UserId.eq(user.id))
        .one(conn)
        .await?
        .ok_or(ServiceError::NotFound("installment"))?;
    Ok((installment, parent))
}

/// Applies a payment to an installment.
///
/// The cumulative paid total is capped at the installment amount;
/// paying the excess away is a domain decision recorded nowhere else,
/// so the ledger row carries the applied (capped) amount, keeping the
/// ledger sum equal to `paid_amount`. The installment flips to paid
/// exactly when the capped total reaches the full amount. A supplied
/// settling-transaction reference overwrites the previous one (latest
/// wins); per-payment references survive in the ledger.
#[instrument(skip(db, user, input), fields(user_id = user.id))]
pub async fn pay_installment(
    db: &DatabaseConnection,
    user: &user::Model,
    installment_id: i32,
    input: InstallmentPaymentInput,
) -> ServiceResult<PaymentOutcome> {
    let txn = db.begin().await?;

    let (current, parent) = load_installment(&txn, user, installment_id).await?;
    if current.is_paid {
        return Err(ServiceError::domain("installment is already fully paid"));
    }

    let outstanding = current.amount - current.paid_amount;
    let requested = quantize(input.amount.unwrap_or(outstanding));
    if requested <= Decimal::ZERO {
        return Err(ServiceError::validation("payment amount must be positive"));
    }

    if let Some(transaction_id) = input.transaction_id {
        let owned = transaction::Entity::find_by_id(transaction_id)
            .filter(transaction::Column::UserId.eq(user.id))
            .one(&txn)
            .await?;
        if owned.is_none() {
            return Err(ServiceError::NotFound("transaction"));
        }
    }

    // Overpayment is capped, not rejected.
    let applied = requested.min(outstanding);
    let new_paid = current.paid_amount + applied;
    let fully_paid = new_paid == current.amount;

    let payment = installment_payment::ActiveModel {
        installment_id: Set(current.id),
        amount: Set(applied),
        paid_on: Set(input.paid_on),
        transaction_id: Set(input.transaction_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: installment::ActiveModel = current.into();
    active.paid_amount = Set(new_paid);
    active.is_paid = Set(fully_paid);
    active.paid_at = Set(fully_paid.then_some(input.paid_on));
    if input.transaction_id.is_some() {
        active.transaction_id = Set(input.transaction_id);
    }
    let updated = active.update(&txn).await?;

    // Close the debt once its last open installment settles.
    let mut debt_closed = false;
    if fully_paid {
        let open = installment::Entity::find()
            .filter(installment::Column::DebtId.eq(parent.id))
            .filter(installment::Column::IsPaid.eq(false))
            .one(&txn)
            .await?;
        if open.is_none() {
            let mut debt_active: debt::ActiveModel = parent.into();
            debt_active.status = Set(DebtStatus::Closed);
            debt_active.update(&txn).await?;
            debt_closed = true;
        }
    }

    txn.commit().await?;
    debug!(
        installment_id,
        applied = %applied,
        fully_paid,
        debt_closed,
        "payment applied"
    );
    Ok(PaymentOutcome {
        installment: updated,
        payment,
        debt_closed,
    })
}
