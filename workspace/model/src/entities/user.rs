use sea_orm::entity::prelude::*;

/// A user of the tracker, identified by their Telegram account.
///
/// `default_wallet_id` is a weak reference: a nullable id with no
/// foreign key, cleared by the service layer when the wallet goes
/// away, so the user ↔ wallet relationship never becomes cyclic
/// ownership.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// External chat-platform identity (Telegram user id).
    #[sea_orm(unique)]
    pub telegram_id: i64,
    pub display_name: String,
    /// Soft-disable flag; inactive users fail authentication.
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    /// The wallet used when a transaction does not name one.
    pub default_wallet_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wallet::Entity")]
    Wallet,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
    #[sea_orm(has_many = "super::debt::Entity")]
    Debt,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::debt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debt.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
