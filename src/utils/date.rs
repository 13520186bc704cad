//! Display dates.
//!
//! Post dates are free-form strings written by authors. They are only
//! generated here (as a build-time fallback) and parsed on a best-effort
//! basis for ordering.

use chrono::{Local, NaiveDate};

/// Format used for generated dates: "Jan 1, 2026".
const DISPLAY_FORMAT: &str = "%b %-d, %Y";

/// Formats tried in order by [`parse_display_date`].
const PARSE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%Y-%m-%d", "%m/%d/%Y", "%d %B %Y", "%d %b %Y"];

/// Today's date in the display format, used when a post declares none.
pub fn today() -> String {
    format_display_date(Local::now().date_naive())
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Best-effort parse of a display date.
///
/// Returns `None` for strings like "Spring 2025" or "TBD"; callers must
/// treat those as unordered.
pub fn parse_display_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim().trim_end_matches('.');
    // "Sept" is common in hand-written dates but unknown to chrono
    let s = s.replacen("Sept ", "Sep ", 1);
    PARSE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display_date() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(format_display_date(date), "Jan 1, 2026");

        let date = NaiveDate::from_ymd_opt(2025, 11, 23).unwrap();
        assert_eq!(format_display_date(date), "Nov 23, 2025");
    }

    #[test]
    fn test_today_round_trips() {
        let today = today();
        assert_eq!(parse_display_date(&today), Some(Local::now().date_naive()));
    }

    #[test]
    fn test_parse_display_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 26);
        assert_eq!(parse_display_date("Jan 26, 2026"), expected);
        assert_eq!(parse_display_date("January 26, 2026"), expected);
        assert_eq!(parse_display_date("2026-01-26"), expected);
        assert_eq!(parse_display_date("01/26/2026"), expected);
        assert_eq!(parse_display_date("26 January 2026"), expected);
        assert_eq!(parse_display_date("  Jan 26, 2026  "), expected);
    }

    #[test]
    fn test_parse_display_date_sept() {
        assert_eq!(parse_display_date("Sept 3, 2024"), NaiveDate::from_ymd_opt(2024, 9, 3));
    }

    #[test]
    fn test_parse_display_date_unparseable() {
        assert_eq!(parse_display_date("Spring 2025"), None);
        assert_eq!(parse_display_date("\\today"), None);
        assert_eq!(parse_display_date(""), None);
    }
}
