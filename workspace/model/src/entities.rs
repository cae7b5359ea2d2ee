//! This file serves as the root for all SeaORM entity modules.
//! The data models for the finance tracker live here: users own
//! wallets, transactions post signed amounts against wallets, and
//! debts own an installment schedule with a per-payment ledger.

pub mod debt;
pub mod installment;
pub mod installment_payment;
pub mod transaction;
pub mod user;
pub mod wallet;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::debt::Entity as Debt;
    pub use super::installment::Entity as Installment;
    pub use super::installment_payment::Entity as InstallmentPayment;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
    pub use super::wallet::Entity as Wallet;
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let now = Utc::now().naive_utc();

        // Create a user
        let user1 = user::ActiveModel {
            telegram_id: Set(111_222_333),
            display_name: Set("Alice".to_string()),
            is_active: Set(true),
            default_wallet_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Create wallets
        let wallet1 = wallet::ActiveModel {
            user_id: Set(user1.id),
            name: Set("Checking".to_string()),
            kind: Set(wallet::WalletKind::Regular),
            currency_code: Set("BRL".to_string()),
            balance: Set(Decimal::ZERO),
            credit_limit: Set(None),
            settlement_day: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let wallet2 = wallet::ActiveModel {
            user_id: Set(user1.id),
            name: Set("Card".to_string()),
            kind: Set(wallet::WalletKind::Credit),
            currency_code: Set("BRL".to_string()),
            balance: Set(Decimal::ZERO),
            credit_limit: Set(Some(Decimal::new(500_000, 2))), // 5000.00
            settlement_day: Set(Some(10)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Point the default wallet back at wallet1 (weak reference)
        let mut user_active: user::ActiveModel = user1.clone().into();
        user_active.default_wallet_id = Set(Some(wallet1.id));
        let user1 = user_active.update(&db).await?;
        assert_eq!(user1.default_wallet_id, Some(wallet1.id));

        // Create a transaction against wallet1
        let tx1 = transaction::ActiveModel {
            user_id: Set(user1.id),
            wallet_id: Set(Some(wallet1.id)),
            kind: Set(transaction::TransactionKind::Expenditure),
            amount: Set(Decimal::new(5_000, 2)), // 50.00
            currency_code: Set("BRL".to_string()),
            occurred_on: Set(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            category: Set(Some("Groceries".to_string())),
            description: Set(Some("Weekly grocery run".to_string())),
            line_items: Set(None),
            source: Set(transaction::TransactionSource::Manual),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Create a debt with two installments and a payment
        let debt1 = debt::ActiveModel {
            user_id: Set(user1.id),
            wallet_id: Set(Some(wallet1.id)),
            counterparty: Set(Some("Bank".to_string())),
            description: Set(None),
            principal: Set(Decimal::new(20_000, 2)), // 200.00
            total_installments: Set(2),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            month_interval: Set(1),
            interest_rate: Set(None),
            status: Set(debt::DebtStatus::Active),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let inst1 = installment::ActiveModel {
            debt_id: Set(debt1.id),
            sequence: Set(1),
            due_date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            amount: Set(Decimal::new(10_000, 2)),
            paid_amount: Set(Decimal::ZERO),
            is_paid: Set(false),
            paid_at: Set(None),
            transaction_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let inst2 = installment::ActiveModel {
            debt_id: Set(debt1.id),
            sequence: Set(2),
            due_date: Set(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            amount: Set(Decimal::new(10_000, 2)),
            paid_amount: Set(Decimal::ZERO),
            is_paid: Set(false),
            paid_at: Set(None),
            transaction_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let payment1 = installment_payment::ActiveModel {
            installment_id: Set(inst1.id),
            amount: Set(Decimal::new(10_000, 2)),
            paid_on: Set(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            transaction_id: Set(Some(tx1.id)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Read back and verify
        let wallets = Wallet::find()
            .filter(wallet::Column::UserId.eq(user1.id))
            .all(&db)
            .await?;
        assert_eq!(wallets.len(), 2);
        assert!(wallets.iter().any(|w| w.id == wallet2.id));

        let installments = inst1
            .find_related(InstallmentPayment)
            .all(&db)
            .await?;
        assert_eq!(installments.len(), 1);
        assert_eq!(installments[0].id, payment1.id);

        let debt_installments = Installment::find()
            .filter(installment::Column::DebtId.eq(debt1.id))
            .all(&db)
            .await?;
        assert_eq!(debt_installments.len(), 2);
        assert!(debt_installments.iter().any(|i| i.id == inst2.id));

        // Deleting the wallet must null the transaction's wallet_id,
        // not delete the transaction.
        let wallet1_id = wallet1.id;
        wallet1.delete(&db).await?;
        let tx1 = Transaction::find_by_id(tx1.id).one(&db).await?.unwrap();
        assert_eq!(tx1.wallet_id, None);

        // The default-wallet pointer is a weak reference with no FK;
        // the stale id stays until default-wallet resolution replaces it.
        let user1 = User::find_by_id(user1.id).one(&db).await?.unwrap();
        assert_eq!(user1.default_wallet_id, Some(wallet1_id));

        // Deleting the debt cascades to installments and payments.
        debt1.delete(&db).await?;
        assert!(Installment::find_by_id(inst2.id).one(&db).await?.is_none());
        assert!(
            InstallmentPayment::find_by_id(payment1.id)
                .one(&db)
                .await?
                .is_none()
        );

        Ok(())
    }
}
