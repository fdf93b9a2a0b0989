use thiserror::Error;

/// Error types for the reminder lifecycle and ledger operations
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Malformed or out-of-range input; the caller must correct and retry
    #[error("Validation error: {0}")]
    Validation(String),

    /// The row is absent or not owned by the caller. The two cases are
    /// deliberately indistinguishable so existence never leaks across users.
    #[error("Not found")]
    NotFound,

    /// The underlying store rejected or failed the operation
    #[error("Persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),

    /// A bill payment recorded its expense but the reminder update did not
    /// apply; the ledger row is orphaned until the user reconciles it.
    #[error(
        "Bill payment partially applied: transaction {transaction_id} was recorded but the reminder was not updated"
    )]
    PartialWorkflow { transaction_id: i32 },
}

/// Type alias for Result with LifecycleError
pub type Result<T> = std::result::Result<T, LifecycleError>;
