use chrono::{Datelike, NaiveDate};
use model::entities::reminder::Frequency;

/// Returns the number of days in the given month using chrono.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    // Create a date for the first day of the next month
    let next_month_year = year + (month / 12) as i32;
    let next_month = (month % 12) + 1;

    // Get the first day of the next month
    let first_day_next_month = NaiveDate::from_ymd_opt(next_month_year, next_month, 1).unwrap();

    // Go back one day to get the last day of the current month
    let last_day_current_month = first_day_next_month.pred_opt().unwrap();

    // The day of the month is the number of days in the month
    last_day_current_month.day()
}

/// Advances a date by one calendar month, clamping the day to the length
/// of the target month (Jan 31 -> Feb 28, or Feb 29 in a leap year).
pub fn add_one_month(date: NaiveDate) -> NaiveDate {
    let year = date.year() + (date.month() / 12) as i32;
    let month = (date.month() % 12) + 1;
    let day = std::cmp::min(date.day(), days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Advances a date by one calendar year. Feb 29 clamps to Feb 28 when the
/// target year is not a leap year.
pub fn add_one_year(date: NaiveDate) -> NaiveDate {
    let year = date.year() + 1;
    let month = date.month();
    let day = std::cmp::min(date.day(), days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Computes the due date of the next instance after paying the current one.
/// Returns `None` for one-time reminders, which are terminal once paid.
pub fn next_due_date(current: NaiveDate, frequency: Frequency) -> Option<NaiveDate> {
    match frequency {
        Frequency::Once => None,
        Frequency::Monthly => Some(add_one_month(current)),
        Frequency::Yearly => Some(add_one_year(current)),
    }
}
