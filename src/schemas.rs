use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::handlers::reminders::ReminderResponse;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for the due-soon sweep query, keyed by (today, window)
    pub cache: Cache<String, Vec<ReminderResponse>>,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::reminders::create_reminder,
        crate::handlers::reminders::get_reminders,
        crate::handlers::reminders::update_reminder,
        crate::handlers::reminders::delete_reminder,
        crate::handlers::reminders::pay_reminder,
        crate::handlers::reminders::get_due_soon,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::update_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
    ),
    components(
        schemas(
            ApiResponse<crate::handlers::reminders::ReminderResponse>,
            ApiResponse<Vec<crate::handlers::reminders::ReminderResponse>>,
            ApiResponse<crate::handlers::reminders::UpdateReminderResponse>,
            ApiResponse<crate::handlers::reminders::PayReminderResponse>,
            ApiResponse<crate::handlers::transactions::TransactionResponse>,
            ApiResponse<Vec<crate::handlers::transactions::TransactionResponse>>,
            ApiResponse<crate::handlers::users::UserResponse>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            crate::handlers::reminders::CreateReminderRequest,
            crate::handlers::reminders::UpdateReminderRequest,
            crate::handlers::reminders::AppliedPatchResponse,
            crate::handlers::reminders::PayReminderRequest,
            crate::handlers::reminders::DueSoonQuery,
            crate::handlers::reminders::ReminderResponse,
            crate::handlers::reminders::UpdateReminderResponse,
            crate::handlers::reminders::PayReminderResponse,
            crate::handlers::transactions::TransactionRequest,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UserResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "reminders", description = "Bill reminder lifecycle endpoints"),
        (name = "transactions", description = "Transaction ledger endpoints"),
        (name = "users", description = "User record endpoints"),
    ),
    info(
        title = "Billminder API",
        description = "Family expense tracker backend - bill reminders with recurrence and a transaction ledger",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
