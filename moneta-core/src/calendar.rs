use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Truncate an instant to the calendar day the ledger files it under.
pub fn day_of(time: DateTime<Utc>) -> NaiveDate {
    time.date_naive()
}

/// First day of the month the given date falls in.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    // with_day(1) cannot fail for a valid date
    date.with_day(1).unwrap_or(date)
}

/// The day before the given date, if representable.
pub fn previous_day(date: NaiveDate) -> Option<NaiveDate> {
    date.pred_opt()
}
