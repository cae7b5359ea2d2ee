use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DebtStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Closed")]
    Closed,
}

/// A principal amount repaid over a fixed number of installments.
///
/// The installment schedule is generated once at creation time.
/// `interest_rate` is stored for reference only; it is not amortized
/// into the per-installment amounts.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub wallet_id: Option<i32>,
    /// Who the money is owed to (or was borrowed from).
    pub counterparty: Option<String>,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub principal: Decimal,
    pub total_installments: i32,
    pub start_date: NaiveDate,
    /// Months between consecutive due dates.
    pub month_interval: i32,
    /// Annual rate, percent. Informational only.
    #[sea_orm(column_type = "Decimal(Some((8, 4)))", nullable)]
    pub interest_rate: Option<Decimal>,
    pub status: DebtStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id",
        on_delete = "SetNull"
    )]
    Wallet,
    #[sea_orm(has_many = "super::installment::Entity")]
    Installment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
