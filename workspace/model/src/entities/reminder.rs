use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::user;

/// Enum for how often a bill comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Frequency {
    #[sea_orm(string_value = "once")]
    Once,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

/// A recurring or one-time obligation to pay a bill.
///
/// `due_date` always refers to the current pending instance. Paying a
/// `monthly` or `yearly` reminder rolls `due_date` forward and keeps
/// `is_paid` false; paying a `once` reminder sets `is_paid` and the row
/// is terminal.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The owning user. Every operation is scoped to this value.
    pub user_id: i32,
    pub description: String,
    /// The amount due per occurrence. Always positive.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    /// The date the current instance is due.
    pub due_date: NaiveDate,
    pub frequency: Frequency,
    #[sea_orm(default_value = "false")]
    pub is_paid: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
