use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use lifecycle::reminder::{
    self, NewReminder, ReminderPatch, DEFAULT_DUE_SOON_WINDOW_DAYS,
};
use lifecycle::LifecycleError;
use model::entities::reminder::Frequency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::handlers::transactions::TransactionResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating a reminder
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateReminderRequest {
    /// What the bill is for (1-200 characters)
    pub description: String,
    /// Amount due per occurrence (must be greater than 0)
    pub amount: Decimal,
    /// Due date of the first instance (YYYY-MM-DD)
    pub due_date: String,
    /// How often the bill repeats: "once", "monthly" or "yearly" (default "once")
    pub frequency: Option<String>,
}

/// Request body for updating a reminder
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateReminderRequest {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    /// New due date (YYYY-MM-DD)
    pub due_date: Option<String>,
    pub frequency: Option<String>,
    /// Setting this to true triggers the paid transition: recurring
    /// reminders roll their due date forward and stay unpaid
    pub is_paid: Option<bool>,
}

/// Request body for paying a reminder
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PayReminderRequest {
    /// How the bill was paid, recorded on the ledger entry
    pub payment_method: Option<String>,
}

/// Query parameters for the due-soon sweep
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct DueSoonQuery {
    /// Lookahead window in days (default: 5)
    #[validate(range(min = 0, max = 60))]
    pub window_days: Option<u16>,
}

/// Reminder response model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReminderResponse {
    pub id: i32,
    pub user_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub frequency: String,
    pub is_paid: bool,
}

impl From<model::entities::reminder::Model> for ReminderResponse {
    fn from(model: model::entities::reminder::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            description: model.description,
            amount: model.amount,
            due_date: model.due_date,
            frequency: frequency_label(model.frequency).to_string(),
            is_paid: model.is_paid,
        }
    }
}

/// The subset of fields an update actually wrote.
///
/// Paying a recurring reminder silently overrides the requested
/// `is_paid: true` into a rollover, so clients must render this rather
/// than echo their own patch.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppliedPatchResponse {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub frequency: Option<String>,
    pub is_paid: Option<bool>,
}

impl From<ReminderPatch> for AppliedPatchResponse {
    fn from(patch: ReminderPatch) -> Self {
        Self {
            description: patch.description,
            amount: patch.amount,
            due_date: patch.due_date,
            frequency: patch.frequency.map(|f| frequency_label(f).to_string()),
            is_paid: patch.is_paid,
        }
    }
}

/// Response for a reminder update
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateReminderResponse {
    pub reminder: ReminderResponse,
    pub applied: AppliedPatchResponse,
}

/// Response for a bill payment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PayReminderResponse {
    pub transaction: TransactionResponse,
    pub reminder: ReminderResponse,
    pub applied: AppliedPatchResponse,
}

// Helper function to parse a frequency string to the stored enum
fn parse_frequency(frequency: &str) -> Result<Frequency, String> {
    match frequency {
        "once" => Ok(Frequency::Once),
        "monthly" => Ok(Frequency::Monthly),
        "yearly" => Ok(Frequency::Yearly),
        _ => Err(format!("Invalid frequency: {}", frequency)),
    }
}

fn frequency_label(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Once => "once",
        Frequency::Monthly => "monthly",
        Frequency::Yearly => "yearly",
    }
}

fn parse_due_date(due_date: &str) -> Result<NaiveDate, (StatusCode, Json<ErrorResponse>)> {
    due_date.parse::<NaiveDate>().map_err(|_| {
        warn!("Rejected unparseable due date: {}", due_date);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Invalid due date '{}', expected YYYY-MM-DD", due_date),
                code: "INVALID_DUE_DATE".to_string(),
                success: false,
            }),
        )
    })
}

fn invalid_frequency(message: String) -> (StatusCode, Json<ErrorResponse>) {
    warn!("{}", message);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message,
            code: "INVALID_FREQUENCY".to_string(),
            success: false,
        }),
    )
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
                error: "Reminder not found".to_string(),
                code: "REMINDER_NOT_FOUND".to_string(),
                success: false,
            }),
        ),
        LifecycleError::Persistence(db_error) => {
            error!("Database error in reminder operation: {}", db_error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Database error occurred".to_string(),
                    code: "DATABASE_ERROR".to_string(),
                    success: false,
                }),
            )
        }
        LifecycleError::PartialWorkflow { transaction_id } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!(
                    "Payment was recorded as transaction {} but the reminder was not updated; please verify your reminders and ledger",
                    transaction_id
                ),
                code: "PARTIAL_WORKFLOW".to_string(),
                success: false,
            }),
        ),
    }
}

/// Create a new reminder
#[utoipa::path(
    post,
    path = "/api/v1/reminders",
    tag = "reminders",
    request_body = CreateReminderRequest,
    responses(
        (status = 201, description = "Reminder created successfully", body = ApiResponse<ReminderResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_reminder(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReminderResponse>>), (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering create_reminder function");
    debug!("Creating reminder '{}' for user {}", request.description, user_id);

    let due_date = parse_due_date(&request.due_date)?;
    let frequency = match request.frequency.as_deref() {
        Some(frequency) => Some(parse_frequency(frequency).map_err(invalid_frequency)?),
        None => None,
    };

    let new = NewReminder {
        description: request.description,
        amount: request.amount,
        due_date,
        frequency,
    };

    match reminder::create_reminder(&state.db, user_id, new).await {
        Ok(row) => {
            info!("Successfully created reminder with ID: {}", row.id);
            let response = ApiResponse {
                data: ReminderResponse::from(row),
                message: "Reminder created successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Get all reminders for the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/reminders",
    tag = "reminders",
    responses(
        (status = 200, description = "Reminders retrieved successfully", body = ApiResponse<Vec<ReminderResponse>>),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_reminders(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ReminderResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering get_reminders function");

    match reminder::list_reminders(&state.db, user_id).await {
        Ok(rows) => {
            info!("Retrieved {} reminders for user {}", rows.len(), user_id);
            let response = ApiResponse {
                data: rows.into_iter().map(ReminderResponse::from).collect(),
                message: "Reminders retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Update a reminder
///
/// Setting `is_paid: true` on a recurring reminder advances its due date
/// and leaves it unpaid; the `applied` field of the response shows what
/// was actually written.
#[utoipa::path(
    put,
    path = "/api/v1/reminders/{reminder_id}",
    tag = "reminders",
    params(
        ("reminder_id" = i32, Path, description = "Reminder ID"),
    ),
    request_body = UpdateReminderRequest,
    responses(
        (status = 200, description = "Reminder updated successfully", body = ApiResponse<UpdateReminderResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_reminder(
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(reminder_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<UpdateReminderRequest>,
) -> Result<Json<ApiResponse<UpdateReminderResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering update_reminder function");
    debug!("Updating reminder {} for user {}", reminder_id, user_id);

    let due_date = match request.due_date.as_deref() {
        Some(due_date) => Some(parse_due_date(due_date)?),
        None => None,
    };
    let frequency = match request.frequency.as_deref() {
        Some(frequency) => Some(parse_frequency(frequency).map_err(invalid_frequency)?),
        None => None,
    };

    let patch = ReminderPatch {
        description: request.description,
        amount: request.amount,
        due_date,
        frequency,
        is_paid: request.is_paid,
    };

    match reminder::update_reminder(&state.db, user_id, reminder_id, patch).await {
        Ok(outcome) => {
            info!("Successfully updated reminder {}", reminder_id);
            let response = ApiResponse {
                data: UpdateReminderResponse {
                    reminder: ReminderResponse::from(outcome.reminder),
                    applied: AppliedPatchResponse::from(outcome.applied),
                },
                message: "Reminder updated successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Delete a reminder
#[utoipa::path(
    delete,
    path = "/api/v1/reminders/{reminder_id}",
    tag = "reminders",
    params(
        ("reminder_id" = i32, Path, description = "Reminder ID"),
    ),
    responses(
        (status = 200, description = "Reminder deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_reminder(
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(reminder_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering delete_reminder function");
    debug!("Deleting reminder {} for user {}", reminder_id, user_id);

    match reminder::delete_reminder(&state.db, user_id, reminder_id).await {
        Ok(()) => {
            info!("Successfully deleted reminder {}", reminder_id);
            let response = ApiResponse {
                data: format!("Reminder {} deleted", reminder_id),
                message: "Reminder deleted successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Pay a reminder
///
/// Records a `Bill Payment` expense on the ledger and applies the paid
/// transition to the reminder. A `PARTIAL_WORKFLOW` error means the expense
/// was recorded but the reminder was not updated.
#[utoipa::path(
    post,
    path = "/api/v1/reminders/{reminder_id}/pay",
    tag = "reminders",
    params(
        ("reminder_id" = i32, Path, description = "Reminder ID"),
    ),
    request_body = PayReminderRequest,
    responses(
        (status = 201, description = "Bill payment recorded successfully", body = ApiResponse<PayReminderResponse>),
        (status = 401, description = "Missing authentication", body = ErrorResponse),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
        (status = 500, description = "Internal server error or partial workflow", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn pay_reminder(
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(reminder_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<PayReminderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PayReminderResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    trace!("Entering pay_reminder function");
    debug!("Paying reminder {} for user {}", reminder_id, user_id);

    let today = chrono::Utc::now().date_naive();

    match reminder::mark_paid_with_transaction(
        &state.db,
        user_id,
        reminder_id,
        request.payment_method,
        today,
    )
    .await
    {
        Ok(outcome) => {
            info!(
                "Recorded payment of reminder {} as transaction {}",
                reminder_id, outcome.transaction.id
            );
            let response = ApiResponse {
                data: PayReminderResponse {
                    transaction: TransactionResponse::from(outcome.transaction),
                    reminder: ReminderResponse::from(outcome.reminder),
                    applied: AppliedPatchResponse::from(outcome.applied),
                },
                message: "Bill payment recorded successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}

/// Get reminders due soon
///
/// Cross-user query backing the scheduled notification sweep; not part of
/// the user-facing surface, so it takes no authentication.
#[utoipa::path(
    get,
    path = "/api/v1/reminders/due-soon",
    tag = "reminders",
    params(DueSoonQuery),
    responses(
        (status = 200, description = "Due reminders retrieved successfully", body = ApiResponse<Vec<ReminderResponse>>),
        (status = 400, description = "Invalid window", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_due_soon(
    Valid(Query(query)): Valid<Query<DueSoonQuery>>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ReminderResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering get_due_soon function");

    let window_days = query.window_days.unwrap_or(DEFAULT_DUE_SOON_WINDOW_DAYS);
    let today = chrono::Utc::now().date_naive();

    // Create cache key
    let cache_key = format!("due_soon_{}_{}", today, window_days);

    // Check cache first
    if let Some(cached) = state.cache.get(&cache_key).await {
        debug!("Due-soon sweep served from cache for {}", cache_key);
        let response = ApiResponse {
            data: cached,
            message: "Due reminders retrieved from cache".to_string(),
            success: true,
        };
        return Ok(Json(response));
    }

    match reminder::find_due_soon(&state.db, today, window_days).await {
        Ok(rows) => {
            info!(
                "Due-soon sweep found {} reminders within {} days",
                rows.len(),
                window_days
            );
            let data: Vec<ReminderResponse> =
                rows.into_iter().map(ReminderResponse::from).collect();

            // Cache the result
            state.cache.insert(cache_key, data.clone()).await;

            let response = ApiResponse {
                data,
                message: "Due reminders retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(err) => Err(lifecycle_error(err)),
    }
}
