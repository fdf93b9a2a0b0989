pub mod error;
pub mod ledger;
pub mod recurrence;
pub mod reminder;

pub use error::{LifecycleError, Result};
