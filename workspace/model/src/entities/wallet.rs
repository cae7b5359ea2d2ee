use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// The kind of wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum WalletKind {
    #[sea_orm(string_value = "Regular")]
    Regular,
    #[sea_orm(string_value = "Investment")]
    Investment,
    #[sea_orm(string_value = "Credit")]
    Credit,
}

/// A named balance bucket owned by exactly one user.
///
/// Invariant: `balance` is the running sum of the signed amounts of all
/// transactions posted against this wallet. It is never recomputed from
/// scratch; every transaction mutation applies its delta atomically.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub kind: WalletKind,
    /// ISO 4217 currency code, e.g., "BRL", "USD".
    pub currency_code: String,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub balance: Decimal,
    /// Credit wallets only.
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub credit_limit: Option<Decimal>,
    /// Day-of-month the credit balance is due. Informational.
    pub settlement_day: Option<i16>,
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
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
