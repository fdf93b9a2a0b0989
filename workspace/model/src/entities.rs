//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the bill reminder application here:
//! users, their reminders, and the ledger of recorded transactions.

pub mod reminder;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::reminder::Entity as Reminder;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}
