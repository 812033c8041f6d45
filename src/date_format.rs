//! Moment-style date formatting for `${date:...}` placeholders.
//!
//! Destination templates carry date formats in the token syntax users know
//! from moment.js (`YYYY-MM-DD`, `Do MMMM`, `[week] W`), so this module
//! translates those tokens onto `chrono` values. Text inside square brackets
//! is copied literally, and characters that are not tokens pass through.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike};

/// Format used for a bare `${date}` placeholder.
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";

/// Recognised tokens, longest first so that `YYYY` wins over `YY`.
const TOKENS: &[&str] = &[
    "YYYY", "MMMM", "DDDD", "dddd", "GGGG", "gggg", "DDDo", "MMM", "DDD", "ddd", "SSS", "YY",
    "MM", "Mo", "DD", "Do", "dd", "do", "ww", "wo", "WW", "Wo", "HH", "hh", "kk", "mm", "ss",
    "SS", "ZZ", "Y", "Q", "M", "D", "d", "E", "e", "w", "W", "H", "h", "k", "m", "s", "S", "A",
    "a", "Z", "X", "x",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Format `time` with a moment-style format string.
///
/// # Example
/// ```
/// use chrono::DateTime;
/// use dlrule::date_format::format_date;
///
/// let t = DateTime::parse_from_rfc3339("2024-03-05T14:07:09Z").unwrap();
/// assert_eq!(format_date(&t, "YYYY-MM-DD"), "2024-03-05");
/// assert_eq!(format_date(&t, "Do MMM, h:mm A"), "5th Mar, 2:07 PM");
/// assert_eq!(format_date(&t, "[Week] W"), "Week 10");
/// ```
pub fn format_date(time: &DateTime<FixedOffset>, format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                out.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }

        match TOKENS.iter().find(|t| rest.starts_with(**t)) {
            Some(token) => {
                out.push_str(&render_token(time, token));
                rest = &rest[token.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    out
}

fn render_token(t: &DateTime<FixedOffset>, token: &str) -> String {
    let weekday = t.weekday().num_days_from_sunday();
    match token {
        "YYYY" => {
            if (0..=9999).contains(&t.year()) {
                format!("{:04}", t.year())
            } else {
                format!("{:+}", t.year())
            }
        }
        "YY" => format!("{:02}", t.year().rem_euclid(100)),
        "Y" => t.year().to_string(),
        "Q" => ((t.month0() / 3) + 1).to_string(),
        "M" => t.month().to_string(),
        "MM" => format!("{:02}", t.month()),
        "Mo" => ordinal(t.month()),
        "MMM" => MONTHS[t.month0() as usize][..3].to_string(),
        "MMMM" => MONTHS[t.month0() as usize].to_string(),
        "D" => t.day().to_string(),
        "DD" => format!("{:02}", t.day()),
        "Do" => ordinal(t.day()),
        "DDD" => t.ordinal().to_string(),
        "DDDD" => format!("{:03}", t.ordinal()),
        "DDDo" => ordinal(t.ordinal()),
        "d" | "e" => weekday.to_string(),
        "do" => ordinal(weekday),
        "dd" => WEEKDAYS[weekday as usize][..2].to_string(),
        "ddd" => WEEKDAYS[weekday as usize][..3].to_string(),
        "dddd" => WEEKDAYS[weekday as usize].to_string(),
        "E" => t.weekday().number_from_monday().to_string(),
        "w" => locale_week(t.date_naive()).1.to_string(),
        "ww" => format!("{:02}", locale_week(t.date_naive()).1),
        "wo" => ordinal(locale_week(t.date_naive()).1),
        "gggg" => format!("{:04}", locale_week(t.date_naive()).0),
        "W" => t.iso_week().week().to_string(),
        "WW" => format!("{:02}", t.iso_week().week()),
        "Wo" => ordinal(t.iso_week().week()),
        "GGGG" => format!("{:04}", t.iso_week().year()),
        "H" => t.hour().to_string(),
        "HH" => format!("{:02}", t.hour()),
        "h" => hour12(t.hour()).to_string(),
        "hh" => format!("{:02}", hour12(t.hour())),
        "k" => hour24_from_one(t.hour()).to_string(),
        "kk" => format!("{:02}", hour24_from_one(t.hour())),
        "m" => t.minute().to_string(),
        "mm" => format!("{:02}", t.minute()),
        "s" => t.second().to_string(),
        "ss" => format!("{:02}", t.second()),
        "S" => (millis(t) / 100).to_string(),
        "SS" => format!("{:02}", millis(t) / 10),
        "SSS" => format!("{:03}", millis(t)),
        "A" => (if t.hour() < 12 { "AM" } else { "PM" }).to_string(),
        "a" => (if t.hour() < 12 { "am" } else { "pm" }).to_string(),
        "Z" => offset(t, true),
        "ZZ" => offset(t, false),
        "X" => t.timestamp().to_string(),
        "x" => t.timestamp_millis().to_string(),
        other => other.to_string(),
    }
}

fn millis(t: &DateTime<FixedOffset>) -> u32 {
    (t.nanosecond() % 1_000_000_000) / 1_000_000
}

fn hour12(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

fn hour24_from_one(hour: u32) -> u32 {
    if hour == 0 {
        24
    } else {
        hour
    }
}

fn offset(t: &DateTime<FixedOffset>, colon: bool) -> String {
    let secs = t.offset().local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let minutes = secs.abs() / 60;
    if colon {
        format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
    } else {
        format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
    }
}

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, ...
fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Week-year and week number with Sunday-first weeks, where week 1 is the
/// week containing January 1st.
///
/// Works in day counts rather than shifted dates so that the first and last
/// representable weeks do not overflow.
fn locale_week(date: NaiveDate) -> (i32, u32) {
    let weekday = date.weekday().num_days_from_sunday() as i64;
    // The Saturday closing the week decides the week-year.
    let week_year = date
        .checked_add_signed(Duration::days(6 - weekday))
        .map_or(date.year(), |end| end.year());

    let Some(jan1) = NaiveDate::from_ymd_opt(week_year, 1, 1) else {
        return (week_year, 1);
    };
    let jan1_weekday = jan1.weekday().num_days_from_sunday() as i64;
    // Days from the Sunday of week 1 to the Sunday of this week
    let days = date.signed_duration_since(jan1).num_days() + jan1_weekday - weekday;
    (week_year, (days / 7 + 1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_default_format() {
        let t = at("2024-03-05T00:00:00Z");
        assert_eq!(format_date(&t, DEFAULT_DATE_FORMAT), "2024-03-05");
    }

    #[test]
    fn test_year_month_day_tokens() {
        let t = at("2024-03-05T00:00:00Z");
        assert_eq!(format_date(&t, "YY/M/D"), "24/3/5");
        assert_eq!(format_date(&t, "MMMM Do, YYYY"), "March 5th, 2024");
        assert_eq!(format_date(&t, "MMM"), "Mar");
        assert_eq!(format_date(&t, "Q"), "1");
        assert_eq!(format_date(&t, "DDD DDDD"), "65 065");
    }

    #[test]
    fn test_weekday_tokens() {
        // 2024-03-05 is a Tuesday
        let t = at("2024-03-05T00:00:00Z");
        assert_eq!(format_date(&t, "d E"), "2 2");
        assert_eq!(format_date(&t, "dd ddd dddd"), "Tu Tue Tuesday");
    }

    #[test]
    fn test_week_tokens() {
        let t = at("2024-03-05T00:00:00Z");
        assert_eq!(format_date(&t, "W WW GGGG"), "10 10 2024");
        assert_eq!(format_date(&t, "w ww gggg"), "10 10 2024");

        // Sunday 2024-12-29 starts the week containing 2025-01-01
        let t = at("2024-12-29T12:00:00Z");
        assert_eq!(format_date(&t, "w gggg"), "1 2025");
        assert_eq!(format_date(&t, "W GGGG"), "52 2024");
    }

    #[test]
    fn test_week_tokens_at_range_edges() {
        let min = DateTime::<Utc>::MIN_UTC.fixed_offset();
        let max = DateTime::<Utc>::MAX_UTC.fixed_offset();
        for t in [min, max] {
            let rendered = format_date(&t, "w ww wo gggg W GGGG");
            assert!(!rendered.is_empty());
        }
        assert!(format_date(&min, "w").parse::<u32>().unwrap() >= 1);
        assert!(format_date(&max, "w").parse::<u32>().unwrap() >= 52);
    }

    #[test]
    fn test_locale_week_year_boundaries() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        // Saturday 2022-01-01 closes week 1 of 2022
        assert_eq!(locale_week(day(2022, 1, 1)), (2022, 1));
        assert_eq!(locale_week(day(2022, 1, 2)), (2022, 2));
        // Saturday 2024-12-28 is the last day of week 52
        assert_eq!(locale_week(day(2024, 12, 28)), (2024, 52));
        assert_eq!(locale_week(day(2024, 12, 31)), (2025, 1));
    }

    #[test]
    fn test_time_tokens() {
        let t = at("2024-03-05T00:07:09.045+02:30");
        assert_eq!(format_date(&t, "H:mm:ss"), "0:07:09");
        assert_eq!(format_date(&t, "hh A a"), "12 AM am");
        assert_eq!(format_date(&t, "k kk"), "24 24");
        assert_eq!(format_date(&t, "S SS SSS"), "0 04 045");
        assert_eq!(format_date(&t, "Z ZZ"), "+02:30 +0230");

        let t = at("2024-03-05T15:00:00-05:00");
        assert_eq!(format_date(&t, "h a"), "3 pm");
        assert_eq!(format_date(&t, "Z"), "-05:00");
    }

    #[test]
    fn test_unix_tokens() {
        let t = at("2024-03-05T00:00:00Z");
        assert_eq!(format_date(&t, "X"), "1709596800");
        assert_eq!(format_date(&t, "x"), "1709596800000");
    }

    #[test]
    fn test_literals() {
        let t = at("2024-03-05T00:00:00Z");
        assert_eq!(format_date(&t, "[Year] YYYY"), "Year 2024");
        assert_eq!(format_date(&t, "YYYY_MM-DD.T"), "2024_03-05.T");
        assert_eq!(format_date(&t, "[YYYY"), "[2024");
        assert_eq!(format_date(&t, ""), "");
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(112), "112th");
    }
}
