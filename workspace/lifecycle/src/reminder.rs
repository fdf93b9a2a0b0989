use chrono::NaiveDate;
use model::entities::reminder::{self, Frequency};
use model::entities::transaction::{self, TransactionKind};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{LifecycleError, Result};
use crate::ledger::{self, NewTransaction};
use crate::recurrence::next_due_date;

/// Longest accepted reminder description.
pub const MAX_DESCRIPTION_LEN: usize = 200;
/// Default lookahead of the due-soon sweep, in days.
pub const DEFAULT_DUE_SOON_WINDOW_DAYS: u16 = 5;
/// Category recorded on ledger rows created by bill payments.
pub const BILL_PAYMENT_CATEGORY: &str = "Utilities";
/// Prefix of ledger descriptions created by bill payments.
const BILL_PAYMENT_PREFIX: &str = "Bill Payment: ";

/// Fields for creating a reminder.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    /// Defaults to `Once` when omitted.
    pub frequency: Option<Frequency>,
}

/// Partial update for a reminder. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub is_paid: Option<bool>,
}

impl ReminderPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.due_date.is_none()
            && self.frequency.is_none()
            && self.is_paid.is_none()
    }
}

/// Result of an update: the stored row plus the patch actually written.
///
/// When paying a recurring reminder the effective patch differs from the
/// requested one (`is_paid: true` becomes a due-date rollover with
/// `is_paid: false`), so callers must read the applied patch rather than
/// echo their request.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub reminder: reminder::Model,
    pub applied: ReminderPatch,
}

/// Result of the mark-paid workflow: the recorded ledger row and the
/// post-payment reminder state.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub transaction: transaction::Model,
    pub reminder: reminder::Model,
    pub applied: ReminderPatch,
}

fn validate_description(description: &str) -> Result<()> {
    if description.is_empty() {
        return Err(LifecycleError::Validation(
            "Description is required".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(LifecycleError::Validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LifecycleError::Validation(
            "Amount must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Loads a reminder scoped to its owner. Foreign and missing ids are both
/// `NotFound` so existence does not leak across users.
async fn find_owned(
    db: &DatabaseConnection,
    user_id: i32,
    reminder_id: i32,
) -> Result<reminder::Model> {
    reminder::Entity::find_by_id(reminder_id)
        .filter(reminder::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(LifecycleError::NotFound)
}

/// Applies the paid-transition rule to a requested patch.
///
/// Paying a `monthly` or `yearly` reminder turns into a due-date rollover
/// with `is_paid: false`; the stored frequency selects the rollover even
/// when the same patch changes the frequency. Computed fields win over
/// caller-supplied values for the same call.
fn effective_patch(current: &reminder::Model, mut patch: ReminderPatch) -> ReminderPatch {
    if patch.is_paid == Some(true) {
        if let Some(next) = next_due_date(current.due_date, current.frequency) {
            patch.due_date = Some(next);
            patch.is_paid = Some(false);
        }
    }
    patch
}

/// Creates a reminder for the user after validating its fields. New
/// reminders always start unpaid.
#[instrument(skip(db))]
pub async fn create_reminder(
    db: &DatabaseConnection,
    user_id: i32,
    new: NewReminder,
) -> Result<reminder::Model> {
    validate_description(&new.description)?;
    validate_amount(new.amount)?;

    let row = reminder::ActiveModel {
        user_id: Set(user_id),
        description: Set(new.description),
        amount: Set(new.amount),
        due_date: Set(new.due_date),
        frequency: Set(new.frequency.unwrap_or(Frequency::Once)),
        is_paid: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created reminder {} for user {}", row.id, row.user_id);
    Ok(row)
}

/// Lists the user's reminders ordered by ascending due date.
pub async fn list_reminders(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<reminder::Model>> {
    let rows = reminder::Entity::find()
        .filter(reminder::Column::UserId.eq(user_id))
        .order_by_asc(reminder::Column::DueDate)
        .all(db)
        .await?;
    Ok(rows)
}

/// Applies a partial update to the user's reminder, including the paid
/// transition when the patch requests `is_paid: true`.
#[instrument(skip(db))]
pub async fn update_reminder(
    db: &DatabaseConnection,
    user_id: i32,
    reminder_id: i32,
    patch: ReminderPatch,
) -> Result<UpdateOutcome> {
    if let Some(description) = &patch.description {
        validate_description(description)?;
    }
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
    }

    let current = find_owned(db, user_id, reminder_id).await?;
    let applied = effective_patch(&current, patch);

    if applied.is_empty() {
        return Ok(UpdateOutcome {
            reminder: current,
            applied,
        });
    }

    let mut row: reminder::ActiveModel = current.into();
    if let Some(description) = applied.description.clone() {
        row.description = Set(description);
    }
    if let Some(amount) = applied.amount {
        row.amount = Set(amount);
    }
    if let Some(due_date) = applied.due_date {
        row.due_date = Set(due_date);
    }
    if let Some(frequency) = applied.frequency {
        row.frequency = Set(frequency);
    }
    if let Some(is_paid) = applied.is_paid {
        row.is_paid = Set(is_paid);
    }

    let updated = row.update(db).await?;
    debug!("Updated reminder {} for user {}", updated.id, user_id);
    Ok(UpdateOutcome {
        reminder: updated,
        applied,
    })
}

/// Deletes the user's reminder. Hard delete; repeating the call for the
/// same id reports `NotFound` rather than succeeding silently.
#[instrument(skip(db))]
pub async fn delete_reminder(
    db: &DatabaseConnection,
    user_id: i32,
    reminder_id: i32,
) -> Result<()> {
    let result = reminder::Entity::delete_many()
        .filter(reminder::Column::Id.eq(reminder_id))
        .filter(reminder::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(LifecycleError::NotFound);
    }

    info!("Deleted reminder {} for user {}", reminder_id, user_id);
    Ok(())
}

/// Records a bill payment: writes an expense to the ledger, then applies
/// the paid transition to the reminder.
///
/// The two writes are sequential, not wrapped in a store transaction. The
/// reminder write is conditional on the state observed at the start of the
/// workflow, so a concurrent payment can orphan a ledger row but never
/// advance the reminder twice. Both the guard missing and the update
/// failing outright surface as `PartialWorkflow` carrying the ledger row
/// id, so the caller can tell the user reconciliation may be needed. If the
/// ledger write fails, the reminder is untouched.
#[instrument(skip(db))]
pub async fn mark_paid_with_transaction(
    db: &DatabaseConnection,
    user_id: i32,
    reminder_id: i32,
    payment_method: Option<String>,
    today: NaiveDate,
) -> Result<PaymentOutcome> {
    let current = find_owned(db, user_id, reminder_id).await?;

    let entry = NewTransaction {
        kind: TransactionKind::Expense,
        amount: current.amount,
        description: format!("{}{}", BILL_PAYMENT_PREFIX, current.description),
        category: Some(BILL_PAYMENT_CATEGORY.to_string()),
        payment_method,
        date: Some(today),
    };
    let recorded = ledger::record_transaction(db, user_id, entry, today).await?;

    let applied = effective_patch(
        &current,
        ReminderPatch {
            is_paid: Some(true),
            ..Default::default()
        },
    );

    // Guarded write: only advance the row that still matches what we read.
    let mut update = reminder::Entity::update_many()
        .col_expr(
            reminder::Column::IsPaid,
            Expr::value(applied.is_paid.unwrap_or(true)),
        )
        .filter(reminder::Column::Id.eq(current.id))
        .filter(reminder::Column::UserId.eq(user_id))
        .filter(reminder::Column::IsPaid.eq(current.is_paid))
        .filter(reminder::Column::DueDate.eq(current.due_date));
    if let Some(due_date) = applied.due_date {
        update = update.col_expr(reminder::Column::DueDate, Expr::value(due_date));
    }

    let rows_affected = match update.exec(db).await {
        Ok(result) => result.rows_affected,
        Err(db_error) => {
            error!(
                "Reminder {} update failed after ledger write {}: {}",
                current.id, recorded.id, db_error
            );
            return Err(LifecycleError::PartialWorkflow {
                transaction_id: recorded.id,
            });
        }
    };
    if rows_affected == 0 {
        warn!(
            "Reminder {} changed underneath the payment; ledger row {} is orphaned",
            current.id, recorded.id
        );
        return Err(LifecycleError::PartialWorkflow {
            transaction_id: recorded.id,
        });
    }

    let reminder = find_owned(db, user_id, reminder_id).await?;
    info!(
        "Recorded bill payment for reminder {} as transaction {}",
        reminder.id, recorded.id
    );
    Ok(PaymentOutcome {
        transaction: recorded,
        reminder,
        applied,
    })
}

/// Returns unpaid reminders due on or before `today + window_days`, across
/// all users and ordered by due date. Overdue reminders stay included until
/// they are paid. This query backs the daily notification sweep and is not
/// user-facing.
#[instrument(skip(db))]
pub async fn find_due_soon(
    db: &DatabaseConnection,
    today: NaiveDate,
    window_days: u16,
) -> Result<Vec<reminder::Model>> {
    let horizon = today + chrono::Duration::days(window_days as i64);
    let rows = reminder::Entity::find()
        .filter(reminder::Column::IsPaid.eq(false))
        .filter(reminder::Column::DueDate.lte(horizon))
        .order_by_asc(reminder::Column::DueDate)
        .all(db)
        .await?;
    debug!(
        "Found {} reminders due on or before {}",
        rows.len(),
        horizon
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use model::entities::user;
    use sea_orm::{ConnectionTrait, Database};

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        for username in ["alice", "bob"] {
            user::ActiveModel {
                username: Set(username.to_string()),
                ..Default::default()
            }
            .insert(&db)
            .await
            .expect("Failed to create test user");
        }

        db
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn new_reminder(description: &str, due: NaiveDate, frequency: Frequency) -> NewReminder {
        NewReminder {
            description: description.to_string(),
            amount: Decimal::new(25000, 2), // 250.00
            due_date: due,
            frequency: Some(frequency),
        }
    }

    fn paid_patch() -> ReminderPatch {
        ReminderPatch {
            is_paid: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_reminder_validation_boundaries() {
        let db = setup_db().await;
        let due = date(2024, 5, 1);

        // Rejected: non-positive amount
        let mut invalid = new_reminder("Rent", due, Frequency::Once);
        invalid.amount = Decimal::ZERO;
        assert!(matches!(
            create_reminder(&db, 1, invalid).await,
            Err(LifecycleError::Validation(_))
        ));

        let mut invalid = new_reminder("Rent", due, Frequency::Once);
        invalid.amount = Decimal::new(-100, 2);
        assert!(matches!(
            create_reminder(&db, 1, invalid).await,
            Err(LifecycleError::Validation(_))
        ));

        // Rejected: empty description
        assert!(matches!(
            create_reminder(&db, 1, new_reminder("", due, Frequency::Once)).await,
            Err(LifecycleError::Validation(_))
        ));

        // Rejected: description over 200 characters
        let too_long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(matches!(
            create_reminder(&db, 1, new_reminder(&too_long, due, Frequency::Once)).await,
            Err(LifecycleError::Validation(_))
        ));

        // Accepted boundaries: amount 0.01 and description of exactly 200
        let boundary = NewReminder {
            description: "y".repeat(MAX_DESCRIPTION_LEN),
            amount: Decimal::new(1, 2), // 0.01
            due_date: due,
            frequency: None,
        };
        let row = create_reminder(&db, 1, boundary)
            .await
            .expect("Boundary values should be accepted");
        // Omitted frequency defaults to once, and new rows start unpaid
        assert_eq!(row.frequency, Frequency::Once);
        assert!(!row.is_paid);
    }

    #[tokio::test]
    async fn test_list_reminders_ordered_by_due_date() {
        let db = setup_db().await;

        for (description, due) in [
            ("Third", date(2024, 9, 1)),
            ("First", date(2024, 3, 1)),
            ("Second", date(2024, 6, 1)),
        ] {
            create_reminder(&db, 1, new_reminder(description, due, Frequency::Once))
                .await
                .expect("Failed to create reminder");
        }

        let rows = list_reminders(&db, 1).await.expect("Failed to list");
        let descriptions: Vec<&str> = rows.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn test_monthly_paid_transition_rolls_over() {
        let db = setup_db().await;
        let row = create_reminder(
            &db,
            1,
            new_reminder("Rent", date(2024, 3, 10), Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");

        let outcome = update_reminder(&db, 1, row.id, paid_patch())
            .await
            .expect("Paid transition should succeed");

        // The requested is_paid: true was overridden into a rollover
        assert_eq!(outcome.applied.is_paid, Some(false));
        assert_eq!(outcome.applied.due_date, Some(date(2024, 4, 10)));
        assert_eq!(outcome.reminder.due_date, date(2024, 4, 10));
        assert!(!outcome.reminder.is_paid);
    }

    #[tokio::test]
    async fn test_monthly_paid_transition_clamps_day() {
        let db = setup_db().await;
        let leap = create_reminder(
            &db,
            1,
            new_reminder("Gym", date(2024, 1, 31), Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");
        let outcome = update_reminder(&db, 1, leap.id, paid_patch())
            .await
            .expect("Paid transition should succeed");
        assert_eq!(outcome.reminder.due_date, date(2024, 2, 29));

        let regular = create_reminder(
            &db,
            1,
            new_reminder("Gym 2023", date(2023, 1, 31), Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");
        let outcome = update_reminder(&db, 1, regular.id, paid_patch())
            .await
            .expect("Paid transition should succeed");
        assert_eq!(outcome.reminder.due_date, date(2023, 2, 28));
    }

    #[tokio::test]
    async fn test_yearly_paid_transition_rolls_over() {
        let db = setup_db().await;
        let row = create_reminder(
            &db,
            1,
            new_reminder("Insurance", date(2023, 6, 15), Frequency::Yearly),
        )
        .await
        .expect("Failed to create reminder");

        let outcome = update_reminder(&db, 1, row.id, paid_patch())
            .await
            .expect("Paid transition should succeed");
        assert_eq!(outcome.reminder.due_date, date(2024, 6, 15));
        assert!(!outcome.reminder.is_paid);
    }

    #[tokio::test]
    async fn test_once_paid_transition_is_terminal() {
        let db = setup_db().await;
        let row = create_reminder(
            &db,
            1,
            new_reminder("Deposit", date(2024, 5, 1), Frequency::Once),
        )
        .await
        .expect("Failed to create reminder");

        let outcome = update_reminder(&db, 1, row.id, paid_patch())
            .await
            .expect("Paid transition should succeed");
        assert_eq!(outcome.applied.is_paid, Some(true));
        assert_eq!(outcome.applied.due_date, None);
        assert_eq!(outcome.reminder.due_date, date(2024, 5, 1));
        assert!(outcome.reminder.is_paid);

        // A second mark-paid changes nothing further
        let outcome = update_reminder(&db, 1, row.id, paid_patch())
            .await
            .expect("Repeated paid transition should succeed");
        assert_eq!(outcome.reminder.due_date, date(2024, 5, 1));
        assert!(outcome.reminder.is_paid);
    }

    #[tokio::test]
    async fn test_paid_transition_uses_stored_frequency() {
        let db = setup_db().await;
        let row = create_reminder(
            &db,
            1,
            new_reminder("Streaming", date(2024, 3, 10), Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");

        // Switching to yearly in the same patch still rolls over monthly,
        // and the computed fields win over the caller's due_date.
        let patch = ReminderPatch {
            frequency: Some(Frequency::Yearly),
            due_date: Some(date(2030, 1, 1)),
            is_paid: Some(true),
            ..Default::default()
        };
        let outcome = update_reminder(&db, 1, row.id, patch)
            .await
            .expect("Paid transition should succeed");
        assert_eq!(outcome.reminder.due_date, date(2024, 4, 10));
        assert_eq!(outcome.reminder.frequency, Frequency::Yearly);
        assert!(!outcome.reminder.is_paid);
    }

    #[tokio::test]
    async fn test_plain_update_applies_patch_verbatim() {
        let db = setup_db().await;
        let row = create_reminder(
            &db,
            1,
            new_reminder("Rent", date(2024, 3, 10), Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");

        let patch = ReminderPatch {
            description: Some("Rent (new landlord)".to_string()),
            amount: Some(Decimal::new(130000, 2)),
            due_date: Some(date(2024, 3, 15)),
            ..Default::default()
        };
        let outcome = update_reminder(&db, 1, row.id, patch)
            .await
            .expect("Update should succeed");
        assert_eq!(outcome.reminder.description, "Rent (new landlord)");
        assert_eq!(outcome.reminder.amount, Decimal::new(130000, 2));
        assert_eq!(outcome.reminder.due_date, date(2024, 3, 15));
        assert!(!outcome.reminder.is_paid);

        // An empty patch is a no-op
        let outcome = update_reminder(&db, 1, row.id, ReminderPatch::default())
            .await
            .expect("Empty patch should succeed");
        assert_eq!(outcome.reminder.due_date, date(2024, 3, 15));
    }

    #[tokio::test]
    async fn test_cross_user_isolation() {
        let db = setup_db().await;
        let row = create_reminder(
            &db,
            1,
            new_reminder("Rent", date(2024, 3, 10), Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");

        assert!(matches!(
            update_reminder(&db, 2, row.id, paid_patch()).await,
            Err(LifecycleError::NotFound)
        ));
        assert!(matches!(
            delete_reminder(&db, 2, row.id).await,
            Err(LifecycleError::NotFound)
        ));
        assert!(matches!(
            mark_paid_with_transaction(&db, 2, row.id, None, date(2024, 3, 10)).await,
            Err(LifecycleError::NotFound)
        ));

        // The other user's listing stays empty
        let rows = list_reminders(&db, 2).await.expect("Failed to list");
        assert!(rows.is_empty());

        // And the row itself was never touched
        let rows = list_reminders(&db, 1).await.expect("Failed to list");
        assert_eq!(rows[0].due_date, date(2024, 3, 10));
    }

    #[tokio::test]
    async fn test_delete_is_strict() {
        let db = setup_db().await;
        let row = create_reminder(
            &db,
            1,
            new_reminder("Rent", date(2024, 3, 10), Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");

        delete_reminder(&db, 1, row.id)
            .await
            .expect("Delete should succeed");
        assert!(matches!(
            delete_reminder(&db, 1, row.id).await,
            Err(LifecycleError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_mark_paid_records_expense_and_advances() {
        let db = setup_db().await;
        let today = date(2024, 3, 10);
        let row = create_reminder(
            &db,
            1,
            new_reminder("Electricity", today, Frequency::Monthly),
        )
        .await
        .expect("Failed to create reminder");

        let outcome =
            mark_paid_with_transaction(&db, 1, row.id, Some("Credit Card".to_string()), today)
                .await
                .expect("Payment should succeed");

        assert_eq!(outcome.transaction.kind, TransactionKind::Expense);
        assert_eq!(outcome.transaction.amount, Decimal::new(25000, 2));
        assert_eq!(outcome.transaction.description, "Bill Payment: Electricity");
        assert_eq!(outcome.transaction.category.as_deref(), Some("Utilities"));
        assert_eq!(
            outcome.transaction.payment_method.as_deref(),
            Some("Credit Card")
        );
        assert_eq!(outcome.transaction.date, today);

        // Exactly one ledger row exists and the reminder rolled over
        let entries = ledger::list_transactions(&db, 1)
            .await
            .expect("Failed to list ledger");
        assert_eq!(entries.len(), 1);
        assert_eq!(outcome.reminder.due_date, date(2024, 4, 10));
        assert!(!outcome.reminder.is_paid);
    }

    #[tokio::test]
    async fn test_mark_paid_once_sets_terminal_state() {
        let db = setup_db().await;
        let today = date(2024, 5, 1);
        let row = create_reminder(&db, 1, new_reminder("Deposit", today, Frequency::Once))
            .await
            .expect("Failed to create reminder");

        let outcome = mark_paid_with_transaction(&db, 1, row.id, None, today)
            .await
            .expect("Payment should succeed");
        assert!(outcome.reminder.is_paid);
        assert_eq!(outcome.reminder.due_date, today);
        assert!(outcome.transaction.payment_method.is_none());
    }

    #[tokio::test]
    async fn test_find_due_soon_window() {
        let db = setup_db().await;
        let today = date(2024, 3, 10);

        let within = create_reminder(
            &db,
            1,
            new_reminder("Due in five days", date(2024, 3, 15), Frequency::Once),
        )
        .await
        .expect("Failed to create reminder");
        let beyond = create_reminder(
            &db,
            1,
            new_reminder("Due in six days", date(2024, 3, 16), Frequency::Once),
        )
        .await
        .expect("Failed to create reminder");
        let overdue = create_reminder(
            &db,
            2,
            new_reminder("Overdue", date(2024, 3, 9), Frequency::Once),
        )
        .await
        .expect("Failed to create reminder");
        let paid = create_reminder(
            &db,
            2,
            new_reminder("Already paid", today, Frequency::Once),
        )
        .await
        .expect("Failed to create reminder");
        update_reminder(&db, 2, paid.id, paid_patch())
            .await
            .expect("Paid transition should succeed");

        let rows = find_due_soon(&db, today, DEFAULT_DUE_SOON_WINDOW_DAYS)
            .await
            .expect("Sweep query should succeed");
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        // Both users' unpaid reminders inside the window, overdue included
        assert!(ids.contains(&within.id));
        assert!(ids.contains(&overdue.id));
        assert!(!ids.contains(&beyond.id));
        assert!(!ids.contains(&paid.id));

        // Ordered by due date, earliest first
        assert_eq!(rows.first().map(|r| r.id), Some(overdue.id));
    }
}
