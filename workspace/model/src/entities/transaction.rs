use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// The direction/nature of a monetary event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TransactionKind {
    #[sea_orm(string_value = "Expenditure")]
    Expenditure,
    #[sea_orm(string_value = "Income")]
    Income,
    #[sea_orm(string_value = "Debt")]
    Debt,
    #[sea_orm(string_value = "Receivable")]
    Receivable,
}

/// Where the record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TransactionSource {
    #[sea_orm(string_value = "Manual")]
    Manual,
    #[sea_orm(string_value = "Chat")]
    Chat,
    #[sea_orm(string_value = "ImageExtraction")]
    ImageExtraction,
}

/// A single monetary event.
///
/// `amount` is always positive; the sign applied to the linked wallet's
/// balance comes from `kind`. Deleting a wallet nulls `wallet_id`
/// instead of cascading, so history survives wallet removal.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub wallet_id: Option<i32>,
    pub kind: TransactionKind,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub amount: Decimal,
    pub currency_code: String,
    pub occurred_on: NaiveDate,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Structured line items, e.g. from receipt extraction.
    #[sea_orm(column_type = "Json", nullable)]
    pub line_items: Option<Json>,
    pub source: TransactionSource,
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
