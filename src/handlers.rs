pub mod health;
pub mod reminders;
pub mod transactions;
pub mod users;
