use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Standard settlement lag in business days (T+2).
pub const SETTLEMENT_LAG_DAYS: u32 = 2;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advance `date` by `days` business days; Saturdays and Sundays do not count.
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        let Some(next) = current.checked_add_days(Days::new(1)) else {
            break;
        };
        current = next;
        if !is_weekend(current) {
            remaining -= 1;
        }
    }
    current
}

/// Default settlement date for a trade booked on `trade_date`.
pub fn settlement_date(trade_date: NaiveDate) -> NaiveDate {
    add_business_days(trade_date, SETTLEMENT_LAG_DAYS)
}
