use chrono::NaiveDate;
use model::entities::transaction::{self, TransactionKind};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, instrument};

use crate::error::{LifecycleError, Result};

/// Longest accepted ledger description.
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Longest accepted category or payment-method label.
pub const MAX_LABEL_LEN: usize = 100;

/// Fields for recording a ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    /// Defaults to the caller's "today" when omitted.
    pub date: Option<NaiveDate>,
}

/// Parses a transaction kind from its wire form.
pub fn parse_kind(kind: &str) -> Result<TransactionKind> {
    match kind {
        "income" => Ok(TransactionKind::Income),
        "expense" => Ok(TransactionKind::Expense),
        _ => Err(LifecycleError::Validation(
            "Type must be income or expense".to_string(),
        )),
    }
}

fn validate_entry(entry: &NewTransaction) -> Result<()> {
    if entry.amount <= Decimal::ZERO {
        return Err(LifecycleError::Validation(
            "Amount must be greater than 0".to_string(),
        ));
    }
    if entry.description.is_empty() {
        return Err(LifecycleError::Validation(
            "Description is required".to_string(),
        ));
    }
    if entry.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(LifecycleError::Validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    if let Some(category) = &entry.category {
        if category.chars().count() > MAX_LABEL_LEN {
            return Err(LifecycleError::Validation(format!(
                "Category must be at most {} characters",
                MAX_LABEL_LEN
            )));
        }
    }
    if let Some(payment_method) = &entry.payment_method {
        if payment_method.chars().count() > MAX_LABEL_LEN {
            return Err(LifecycleError::Validation(format!(
                "Payment method must be at most {} characters",
                MAX_LABEL_LEN
            )));
        }
    }
    if entry.kind == TransactionKind::Expense
        && entry
            .category
            .as_ref()
            .map_or(true, |category| category.trim().is_empty())
    {
        return Err(LifecycleError::Validation(
            "Category is required for expenses".to_string(),
        ));
    }
    Ok(())
}

/// Validates and appends a ledger entry for the user.
///
/// The category is only stored for expenses; a category arriving on an
/// income entry is dropped rather than rejected.
#[instrument(skip(db))]
pub async fn record_transaction(
    db: &DatabaseConnection,
    user_id: i32,
    entry: NewTransaction,
    today: NaiveDate,
) -> Result<transaction::Model> {
    validate_entry(&entry)?;

    let category = match entry.kind {
        TransactionKind::Expense => entry.category,
        TransactionKind::Income => None,
    };

    let row = transaction::ActiveModel {
        user_id: Set(user_id),
        kind: Set(entry.kind),
        amount: Set(entry.amount),
        description: Set(entry.description),
        category: Set(category),
        payment_method: Set(entry.payment_method),
        date: Set(entry.date.unwrap_or(today)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Recorded transaction {} for user {}", row.id, row.user_id);
    Ok(row)
}

/// Lists the user's ledger entries, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<transaction::Model>> {
    let rows = transaction::Entity::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_desc(transaction::Column::Date)
        .all(db)
        .await?;
    Ok(rows)
}

/// Replaces the editable fields of the user's ledger entry. The stored date
/// is kept unless the caller provides a new one.
#[instrument(skip(db))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    user_id: i32,
    transaction_id: i32,
    entry: NewTransaction,
) -> Result<transaction::Model> {
    validate_entry(&entry)?;

    let current = transaction::Entity::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(LifecycleError::NotFound)?;

    let category = match entry.kind {
        TransactionKind::Expense => entry.category,
        TransactionKind::Income => None,
    };

    let mut row: transaction::ActiveModel = current.into();
    row.kind = Set(entry.kind);
    row.amount = Set(entry.amount);
    row.description = Set(entry.description);
    row.category = Set(category);
    row.payment_method = Set(entry.payment_method);
    if let Some(date) = entry.date {
        row.date = Set(date);
    }

    let updated = row.update(db).await?;
    debug!("Updated transaction {} for user {}", updated.id, user_id);
    Ok(updated)
}

/// Deletes the user's ledger entry. Absent and foreign ids both report
/// `NotFound`.
#[instrument(skip(db))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    user_id: i32,
    transaction_id: i32,
) -> Result<()> {
    let result = transaction::Entity::delete_many()
        .filter(transaction::Column::Id.eq(transaction_id))
        .filter(transaction::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(LifecycleError::NotFound);
    }

    info!("Deleted transaction {} for user {}", transaction_id, user_id);
    Ok(())
}
