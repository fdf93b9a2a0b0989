use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use lifecycle::ledger::{self, NewTransaction};
use lifecycle::LifecycleError;
use model::entities::transaction::{self, TransactionKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::auth::AuthenticatedUser;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating or replacing a ledger entry
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TransactionRequest {
    /// "income" or "expense"
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount moved (must be greater than 0)
    pub amount: Decimal,
    /// What the money movement was (1-500 characters)
    pub description: String,
    /// Spending category; required for expenses, ignored for income
    pub category: Option<String>,
    pub payment_method: Option<String>,
    /// Date of the movement (YYYY-MM-DD); defaults to today on creation
    pub date: Option<String>,
}

/// Ledger entry response model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub date: NaiveDate,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            kind: kind_label(model.kind).to_string(),
            amount: model.amount,
            description: model.description,
            category: model.category,
            payment_method: model.payment_method,
            date: model.date,
        }
    }
}

fn kind_label(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "income",
        TransactionKind::Expense => "expense",
    }
}

fn parse_date(date: &str) -> Result<NaiveDate, (StatusCode, Json<ErrorResponse>)> {
    date.parse::<NaiveDate>().map_err(|_| {
        warn!("Rejected unparseable transaction date: {}", date);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Invalid date '{}', expected YYYY-MM-DD", date),
                code: "INVALID_DATE".to_string(),
                success: false,
            }),
        )
    })
}

// Maps a lifecycle error to the wire error contract
fn lifecycle_error(err: LifecycleError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        LifecycleError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: message,
                code: "VALIDATION_ERROR".to_string(),
                success: false,
            }),
        ),
        LifecycleError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Transaction not found".to_string(),
                code: "TRANSACTION_NOT_FOUND".to_string(),
                success: false,
            }),
        ),
        LifecycleError::Persistence(db_error) => {
            error!("Database error in transaction operation: {}", db_error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Database error occurred".to_string(),
                    code: "DATABASE_ERROR".to_string(),
                    success: false,
                }),
            )
        }
        // The ledger never runs the two-write payment workflow itself
        LifecycleError::PartialWorkflow { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Internal server error".to_string(),
                code: "INTERNAL_ERROR".to_string(),
                success: false,
            }),
        ),
    }
}

fn build_entry(
    request: TransactionRequest,
) -> Result<NewTransaction, (StatusCode, Json<ErrorResponse>)> {
    let kind = ledger::parse_kind(&request.kind).map_err(lifecycle_error)?;
    let date = match request.date.as_deref() {
        Some(date) => Some(parse_date(date)?),
        None => None,
    };
    Ok(NewTransaction {
        kind,
        amount: request.amount,
        description: request.description,
        category: request.category,
        payment_method: request.payment_method,
        date,
    })
}

/// Record a new ledger entry
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_transaction(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    trace!("Entering create_transaction function");
    debug!("Recording transaction for user {}", user_id);

    let entry = build_entry(request)?;
    let today = chrono::Utc::now().date_naive();

    match ledger::record_transaction(&state.db, user_id, entry, today).await {
        Ok(row) => {
            info!("Successfully recorded transaction with ID: {}", row.id);
            let response = ApiResponse {
                data: TransactionResponse::from(row),
                message: "Transaction recorded successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Get all ledger entries for the authenticated user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transactions(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering get_transactions function");

    match ledger::list_transactions(&state.db, user_id).await {
        Ok(rows) => {
            info!("Retrieved {} transactions for user {}", rows.len(), user_id);
            let response = ApiResponse {
                data: rows.into_iter().map(TransactionResponse::from).collect(),
                message: "Transactions retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Update a ledger entry
#[utoipa::path(
    put,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_transaction(
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<ApiResponse<TransactionResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering update_transaction function");
    debug!(
        "Updating transaction {} for user {}",
        transaction_id, user_id
    );

    let entry = build_entry(request)?;

    match ledger::update_transaction(&state.db, user_id, transaction_id, entry).await {
        Ok(row) => {
            info!("Successfully updated transaction {}", transaction_id);
            let response = ApiResponse {
                data: TransactionResponse::from(row),
                message: "Transaction updated successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Delete a ledger entry
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_transaction(
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering delete_transaction function");
    debug!(
        "Deleting transaction {} for user {}",
        transaction_id, user_id
    );

    match ledger::delete_transaction(&state.db, user_id, transaction_id).await {
        Ok(()) => {
            info!("Successfully deleted transaction {}", transaction_id);
            let response = ApiResponse {
                data: format!("Transaction {} deleted", transaction_id),
                message: "Transaction deleted successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}
