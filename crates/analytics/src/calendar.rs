use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

/// Today if it is a Friday, otherwise the coming Friday.
#[must_use]
pub fn next_friday(today: NaiveDate) -> NaiveDate {
    let ahead = (7 + Weekday::Fri.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    today + Days::new(u64::from(ahead))
}

/// Calendar days of intraday history to show; reaches over the weekend early in the week.
#[must_use]
pub fn intraday_lookback_days(today: NaiveDate) -> u64 {
    match today.weekday() {
        Weekday::Mon | Weekday::Tue => 5,
        _ => 3,
    }
}

/// First day of the long-period chart, three months back.
#[must_use]
pub fn long_period_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(3))
        .unwrap_or(today - Days::new(90))
}

/// Whether a separate next-Friday section is worth rendering for `symbol`.
///
/// Only symbols with daily expirations have a current expiry distinct from Friday's.
#[must_use]
pub fn should_include_friday(symbol: &str, daily_expiry_symbols: &[String], today: NaiveDate) -> bool {
    today.weekday() != Weekday::Fri
        && daily_expiry_symbols
            .iter()
            .any(|s| s.eq_ignore_ascii_case(symbol))
}
