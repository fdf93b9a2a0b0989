use sea_orm::entity::prelude::*;

/// Represents a user of the system.
///
/// Registration and credential storage live in the upstream authentication
/// gate; this row only anchors ownership of reminders and ledger entries.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    // A user can have multiple bill reminders.
    #[sea_orm(has_many = "super::reminder::Entity")]
    Reminder,
    // A user can have multiple ledger entries.
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
}

impl ActiveModelBehavior for ActiveModel {}
