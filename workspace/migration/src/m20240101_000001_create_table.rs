use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table.
        // DefaultWalletId is a weak reference on purpose: no foreign
        // key, resolution and cleanup happen in the service layer.
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(big_integer(Users::TelegramId).unique_key())
                    .col(string(Users::DisplayName))
                    .col(boolean(Users::IsActive).default(true))
                    .col(integer_null(Users::DefaultWalletId))
                    .to_owned(),
            )
            .await?;

        // Create wallets table
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(pk_auto(Wallets::Id))
                    .col(integer(Wallets::UserId))
                    .col(string(Wallets::Name))
                    .col(string_len(Wallets::Kind, 20))
                    .col(string(Wallets::CurrencyCode))
                    .col(decimal_len(Wallets::Balance, 16, 2).default(0))
                    .col(decimal_len_null(Wallets::CreditLimit, 16, 2))
                    .col(small_integer_null(Wallets::SettlementDay))
                    .col(date_time(Wallets::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallet_user")
                            .from(Wallets::Table, Wallets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::UserId))
                    .col(integer_null(Transactions::WalletId))
                    .col(string_len(Transactions::Kind, 20))
                    .col(decimal_len(Transactions::Amount, 16, 2))
                    .col(string(Transactions::CurrencyCode))
                    .col(date(Transactions::OccurredOn))
                    .col(string_null(Transactions::Category))
                    .col(string_null(Transactions::Description))
                    .col(string_len(Transactions::Source, 20))
                    .col(date_time(Transactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_user")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_wallet")
                            .from(Transactions::Table, Transactions::WalletId)
                            .to(Wallets::Table, Wallets::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create debts table
        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(pk_auto(Debts::Id))
                    .col(integer(Debts::UserId))
                    .col(integer_null(Debts::WalletId))
                    .col(string_null(Debts::Counterparty))
                    .col(string_null(Debts::Description))
                    .col(decimal_len(Debts::Principal, 16, 2))
                    .col(integer(Debts::TotalInstallments))
                    .col(date(Debts::StartDate))
                    .col(integer(Debts::MonthInterval))
                    .col(decimal_len_null(Debts::InterestRate, 8, 4))
                    .col(string_len(Debts::Status, 20))
                    .col(date_time(Debts::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_debt_user")
                            .from(Debts::Table, Debts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_debt_wallet")
                            .from(Debts::Table, Debts::WalletId)
                            .to(Wallets::Table, Wallets::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create installments table
        manager
            .create_table(
                Table::create()
                    .table(Installments::Table)
                    .if_not_exists()
                    .col(pk_auto(Installments::Id))
                    .col(integer(Installments::DebtId))
                    .col(integer(Installments::Sequence))
                    .col(date(Installments::DueDate))
                    .col(decimal_len(Installments::Amount, 16, 2))
                    .col(decimal_len(Installments::PaidAmount, 16, 2).default(0))
                    .col(boolean(Installments::IsPaid).default(false))
                    .col(date_null(Installments::PaidAt))
                    .col(integer_null(Installments::TransactionId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_debt")
                            .from(Installments::Table, Installments::DebtId)
                            .to(Debts::Table, Debts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_transaction")
                            .from(Installments::Table, Installments::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create installment_payments table (append-only ledger)
        manager
            .create_table(
                Table::create()
                    .table(InstallmentPayments::Table)
                    .if_not_exists()
                    .col(pk_auto(InstallmentPayments::Id))
                    .col(integer(InstallmentPayments::InstallmentId))
                    .col(decimal_len(InstallmentPayments::Amount, 16, 2))
                    .col(date(InstallmentPayments::PaidOn))
                    .col(integer_null(InstallmentPayments::TransactionId))
                    .col(date_time(InstallmentPayments::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_payment_installment")
                            .from(
                                InstallmentPayments::Table,
                                InstallmentPayments::InstallmentId,
                            )
                            .to(Installments::Table, Installments::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_payment_transaction")
                            .from(
                                InstallmentPayments::Table,
                                InstallmentPayments::TransactionId,
                            )
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One schedule position per debt.
        manager
            .create_index(
                Index::create()
                    .name("idx_installment_debt_sequence")
                    .table(Installments::Table)
                    .col(Installments::DebtId)
                    .col(Installments::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transaction_user_occurred_on")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::OccurredOn)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InstallmentPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Installments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Debts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    TelegramId,
    DisplayName,
    IsActive,
    DefaultWalletId,
}

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    UserId,
    Name,
    Kind,
    CurrencyCode,
    Balance,
    CreditLimit,
    SettlementDay,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    WalletId,
    Kind,
    Amount,
    CurrencyCode,
    OccurredOn,
    Category,
    Description,
    Source,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Debts {
    Table,
    Id,
    UserId,
    WalletId,
    Counterparty,
    Description,
    Principal,
    TotalInstallments,
    StartDate,
    MonthInterval,
    InterestRate,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Installments {
    Table,
    Id,
    DebtId,
    Sequence,
    DueDate,
    Amount,
    PaidAmount,
    IsPaid,
    PaidAt,
    TransactionId,
}

#[derive(DeriveIden)]
enum InstallmentPayments {
    Table,
    Id,
    InstallmentId,
    Amount,
    PaidOn,
    TransactionId,
    CreatedAt,
}
