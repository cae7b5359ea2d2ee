use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// One scheduled repayment slice of a debt.
///
/// Invariants: `paid_amount <= amount`, and `is_paid` holds exactly
/// when `paid_amount` has reached `amount`. Transitions are forward
/// only (unpaid → partially paid → paid); there is no unpay path.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "installments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub debt_id: i32,
    /// 1-based position within the debt's schedule.
    pub sequence: i32,
    pub due_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub paid_amount: Decimal,
    #[sea_orm(default_value = "false")]
    pub is_paid: bool,
    pub paid_at: Option<NaiveDate>,
    /// Latest settling transaction. Per-payment references live in the
    /// payment ledger.
    pub transaction_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::debt::Entity",
        from = "Column::DebtId",
        to = "super::debt::Column::Id",
        on_delete = "Cascade"
    )]
    Debt,
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id",
        on_delete = "SetNull"
    )]
    Transaction,
    #[sea_orm(has_many = "super::installment_payment::Entity")]
    InstallmentPayment,
}

impl Related<super::debt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debt.def()
    }
}

impl Related<super::installment_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstallmentPayment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
