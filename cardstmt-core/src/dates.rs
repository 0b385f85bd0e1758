//! Date tokens stay verbatim; this module only ranks them.
//!
//! The calendar parse here exists solely to pick the earliest of several
//! tokens. Its result is never written into a record.

use chrono::NaiveDate;
use std::sync::OnceLock;

use regex::Regex;

/// Field order of numeric dates on a given statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// dd/mm/yyyy (rupee statements)
    DayFirst,
    /// mm/dd/yy (US statements)
    MonthFirst,
}

fn numeric_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})").expect("numeric date regex")
    })
}

/// Best-effort calendar reading of a date token, for comparison only.
///
/// Two-digit years are taken to be in the 2000s.
pub fn date_sort_key(token: &str, order: DateOrder) -> Option<NaiveDate> {
    let t = token.trim();
    if let Some(caps) = numeric_date_re().captures(t) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        let (month, day) = match order {
            DateOrder::DayFirst => (b, a),
            DateOrder::MonthFirst => (a, b),
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    ["%d %b %Y", "%d-%b-%Y", "%B %d, %Y", "%b %d, %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}

/// The token with the earliest calendar reading. Unreadable tokens rank
/// last; ties keep document order.
pub fn earliest_date<'a, I>(tokens: I, order: DateOrder) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().min_by_key(|t| {
        let key = date_sort_key(t, order);
        (key.is_none(), key)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_first_short_year() {
        assert_eq!(
            date_sort_key("05/28/24", DateOrder::MonthFirst),
            NaiveDate::from_ymd_opt(2024, 5, 28)
        );
    }

    #[test]
    fn test_day_first_long_year() {
        assert_eq!(
            date_sort_key("22/06/2024", DateOrder::DayFirst),
            NaiveDate::from_ymd_opt(2024, 6, 22)
        );
        assert_eq!(date_sort_key("22/06/2024", DateOrder::MonthFirst), None);
    }

    #[test]
    fn test_month_name_forms() {
        assert_eq!(
            date_sort_key("6 Sep 2025", DateOrder::DayFirst),
            NaiveDate::from_ymd_opt(2025, 9, 6)
        );
        assert_eq!(
            date_sort_key("June 22, 2024", DateOrder::DayFirst),
            NaiveDate::from_ymd_opt(2024, 6, 22)
        );
    }

    #[test]
    fn test_earliest_date_keeps_raw_token() {
        let dates = ["05/15/24", "04/29/24", "garbage", "05/01/24"];
        assert_eq!(earliest_date(dates, DateOrder::MonthFirst), Some("04/29/24"));
    }

    #[test]
    fn test_earliest_date_all_unreadable_returns_first() {
        assert_eq!(earliest_date(["x", "y"], DateOrder::DayFirst), Some("x"));
        assert_eq!(earliest_date(Vec::<&str>::new(), DateOrder::DayFirst), None);
    }
}
