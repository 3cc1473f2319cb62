//! # Display Formatting (fr-FR)
//!
//! Currency, dates and relative times as the back-office shows them.
//! Amounts are West African CFA francs (XOF), which have no minor unit.

use chrono::{DateTime, NaiveDate, Utc};

use crate::temporal::LocalCalendar;

const NARROW_NBSP: char = '\u{202f}';
const NBSP: char = '\u{a0}';

/// `1234567.0` → `"1 234 567 F CFA"` (narrow no-break space grouping).
pub fn format_xof(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 3);
    let len = digits.len();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(NARROW_NBSP);
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}{NBSP}F{NBSP}CFA")
}

/// `"18/10/2026"`.
pub fn format_date_fr(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Signed growth with one decimal: `"+12.5%"`, `"-3.0%"`.
pub fn format_growth(growth: f64) -> String {
    if growth >= 0.0 {
        format!("+{growth:.1}%")
    } else {
        format!("{growth:.1}%")
    }
}

/// Relative time label: "À l'instant", "Il y a 5 min", "Il y a 3 h",
/// "Il y a 2 j", then the plain local date after a week.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>, calendar: &LocalCalendar) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "À l'instant".to_string()
    } else if minutes < 60 {
        format!("Il y a {minutes} min")
    } else if hours < 24 {
        format!("Il y a {hours} h")
    } else if days < 7 {
        format!("Il y a {days} j")
    } else {
        format_date_fr(calendar.local_date(then))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn xof_groups_thousands() {
        assert_eq!(format_xof(0.0), "0\u{a0}F\u{a0}CFA");
        assert_eq!(format_xof(950.0), "950\u{a0}F\u{a0}CFA");
        assert_eq!(format_xof(1234567.0), "1\u{202f}234\u{202f}567\u{a0}F\u{a0}CFA");
        assert_eq!(format_xof(100000.4), "100\u{202f}000\u{a0}F\u{a0}CFA");
        assert_eq!(format_xof(-2500.0), "-2\u{202f}500\u{a0}F\u{a0}CFA");
    }

    #[test]
    fn growth_is_signed() {
        assert_eq!(format_growth(12.5), "+12.5%");
        assert_eq!(format_growth(0.0), "+0.0%");
        assert_eq!(format_growth(-3.0), "-3.0%");
    }

    #[test]
    fn time_ago_buckets() {
        let cal = LocalCalendar::utc();
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(20), now, &cal), "À l'instant");
        assert_eq!(time_ago(now - Duration::minutes(5), now, &cal), "Il y a 5 min");
        assert_eq!(time_ago(now - Duration::hours(3), now, &cal), "Il y a 3 h");
        assert_eq!(time_ago(now - Duration::days(2), now, &cal), "Il y a 2 j");
        assert_eq!(time_ago(now - Duration::days(10), now, &cal), "08/10/2026");
    }
}
