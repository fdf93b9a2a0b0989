use crate::handlers::{
    health::health_check,
    reminders::{
        create_reminder, delete_reminder, get_due_soon, get_reminders, pay_reminder,
        update_reminder,
    },
    transactions::{
        create_transaction, delete_transaction, get_transactions, update_transaction,
    },
    users::{create_user, get_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // User record routes
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/:user_id", get(get_user))
        // Reminder lifecycle routes
        .route("/api/v1/reminders", post(create_reminder))
        .route("/api/v1/reminders", get(get_reminders))
        .route("/api/v1/reminders/due-soon", get(get_due_soon))
        .route("/api/v1/reminders/:reminder_id", put(update_reminder))
        .route("/api/v1/reminders/:reminder_id", delete(delete_reminder))
        .route("/api/v1/reminders/:reminder_id/pay", post(pay_reminder))
        // Transaction ledger routes
        .route("/api/v1/transactions", post(create_transaction))
        .route("/api/v1/transactions", get(get_transactions))
        .route("/api/v1/transactions/:transaction_id", put(update_transaction))
        .route("/api/v1/transactions/:transaction_id", delete(delete_transaction))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
