use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create reminders table
        manager
            .create_table(
                Table::create()
                    .table(Reminders::Table)
                    .if_not_exists()
                    .col(pk_auto(Reminders::Id))
                    .col(integer(Reminders::UserId))
                    .col(string(Reminders::Description))
                    .col(decimal(Reminders::Amount).decimal_len(16, 4))
                    .col(date(Reminders::DueDate))
                    .col(string_len(Reminders::Frequency, 16))
                    .col(boolean(Reminders::IsPaid).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reminder_user")
                            .from(Reminders::Table, Reminders::UserId)
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
                    .col(string_len(Transactions::Kind, 16))
                    .col(decimal(Transactions::Amount).decimal_len(16, 4))
                    .col(string(Transactions::Description))
                    .col(string_null(Transactions::Category))
                    .col(string_null(Transactions::PaymentMethod))
                    .col(date(Transactions::Date))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_user")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The daily sweep filters on (is_paid, due_date) across all users.
        manager
            .create_index(
                Index::create()
                    .name("idx_reminders_is_paid_due_date")
                    .table(Reminders::Table)
                    .col(Reminders::IsPaid)
                    .col(Reminders::DueDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Reminders::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

// Define identifiers for all tables

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
}

#[derive(DeriveIden)]
enum Reminders {
    Table,
    Id,
    UserId,
    Description,
    Amount,
    DueDate,
    Frequency,
    IsPaid,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    Description,
    Category,
    PaymentMethod,
    Date,
}
