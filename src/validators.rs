//! Appointment date/time validation.
//!
//! Pure functions, no I/O: the current moment is passed in by the caller so
//! the checks are deterministic under test.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("❌ Invalid date format. Please use formats like: 'Monday', '15.10.2025', '15/10/2025'")]
    BadDateFormat,
    #[error("❌ We don't work on {0}s. Please choose Monday-Friday.")]
    Weekend(&'static str),
    #[error("❌ Invalid time format. Please use formats like: '10:00', '14:30', '2:00 PM'")]
    BadTimeFormat,
    #[error("❌ Time must be between 09:00 and 18:00.")]
    OutsideWorkingHours,
    #[error("❌ Lunch time (13:00-14:00). Please choose another time.")]
    LunchBreak,
    #[error("❌ Cannot book appointments in the past. Please choose a future date.")]
    InPast,
}

const WORKING_DAYS: [(&str, Weekday); 5] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
];

fn working_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn working_end() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap()
}

fn lunch_start() -> NaiveTime {
    NaiveTime::from_hms_opt(13, 0, 0).unwrap()
}

fn lunch_end() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 0, 0).unwrap()
}

pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse free-text time: 24-hour `H:MM` / `HH:MM`, or 12-hour with AM/PM.
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let normalized = input.trim().to_uppercase();
    if let Ok(t) = NaiveTime::parse_from_str(&normalized, "%H:%M") {
        return Some(t);
    }
    NaiveTime::parse_from_str(&normalized, "%I:%M %p").ok()
}

/// Parse free-text date. A working-day name appearing anywhere in the input
/// wins first and yields no concrete date; otherwise the numeric formats
/// `DD.MM.YYYY`, `DD/MM/YYYY`, `YYYY-MM-DD`, `DD.MM`, `DD/MM` are tried in
/// order, the last two assuming `current_year`.
pub fn parse_date(input: &str, current_year: i32) -> Option<(Weekday, Option<NaiveDate>)> {
    let normalized = input.trim().to_lowercase();

    for (name, weekday) in WORKING_DAYS {
        if normalized.contains(name) {
            return Some((weekday, None));
        }
    }

    for format in ["%d.%m.%Y", "%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Some((date.weekday(), Some(date)));
        }
    }

    // Day-and-month forms, completed with the caller's current year.
    for (format, separator) in [("%d.%m.%Y", '.'), ("%d/%m/%Y", '/')] {
        let candidate = format!("{normalized}{separator}{current_year}");
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, format) {
            return Some((date.weekday(), Some(date)));
        }
    }

    None
}

/// Validate an appointment slot against the business rules, in order:
/// working weekday, working hours `[09:00, 18:00)`, lunch break
/// `[13:00, 14:00)`, and — only when a concrete calendar date was given —
/// not in the past relative to `now`.
pub fn validate_appointment_time(
    date_text: &str,
    time_text: &str,
    now: NaiveDateTime,
) -> Result<(), ValidationError> {
    let (weekday, date) =
        parse_date(date_text, now.year()).ok_or(ValidationError::BadDateFormat)?;

    if !WORKING_DAYS.iter().any(|(_, wd)| *wd == weekday) {
        return Err(ValidationError::Weekend(day_name(weekday)));
    }

    let time = parse_time(time_text).ok_or(ValidationError::BadTimeFormat)?;

    if time < working_start() || time >= working_end() {
        return Err(ValidationError::OutsideWorkingHours);
    }
    if time >= lunch_start() && time < lunch_end() {
        return Err(ValidationError::LunchBreak);
    }
    if let Some(date) = date {
        if date.and_time(time) < now {
            return Err(ValidationError::InPast);
        }
    }

    Ok(())
}

/// Working-hours blurb shown before the date prompt.
pub fn working_hours_text() -> String {
    "📅 <b>Working Hours:</b>\n\
     • Days: Monday - Friday\n\
     • Time: 09:00 - 18:00\n\
     • Lunch: 13:00 - 14:00 (closed)"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    // A Tuesday morning, used as the fixed "current moment".
    fn now() -> NaiveDateTime {
        at(2025, 10, 14, 8, 0)
    }

    #[test]
    fn twenty_four_hour_and_twelve_hour_times_agree() {
        assert_eq!(parse_time("14:00"), parse_time("2:00 PM"));
        assert_eq!(parse_time("9:30"), parse_time("09:30"));
        assert_eq!(parse_time(" 10:15 am "), parse_time("10:15"));
    }

    #[test]
    fn midnight_and_noon_edge_cases() {
        assert_eq!(
            parse_time("12:00 AM"),
            Some(NaiveTime::from_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_time("12:00 PM"),
            Some(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
        );
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["25:00", "10:75", "10", "10.30", "13:00 XM", ""] {
            assert_eq!(parse_time(bad), None, "{bad:?} should not parse");
        }
    }

    #[test]
    fn weekday_names_match_without_a_concrete_date() {
        let (weekday, date) = parse_date("next Monday please", 2025).unwrap();
        assert_eq!(weekday, Weekday::Mon);
        assert_eq!(date, None);
    }

    #[test]
    fn numeric_formats_resolve_a_concrete_date() {
        let expected = NaiveDate::from_ymd_opt(2025, 10, 15).unwrap();
        for text in ["15.10.2025", "15/10/2025", "2025-10-15", "15.10", "15/10"] {
            let (weekday, date) = parse_date(text, 2025).unwrap();
            assert_eq!(date, Some(expected), "{text:?}");
            assert_eq!(weekday, Weekday::Wed);
        }
    }

    #[test]
    fn unparseable_dates_are_rejected() {
        assert_eq!(parse_date("someday", 2025), None);
        assert_eq!(parse_date("32.13.2025", 2025), None);
        assert_eq!(
            validate_appointment_time("someday", "10:00", now()),
            Err(ValidationError::BadDateFormat)
        );
    }

    #[test]
    fn valid_weekday_slots_pass() {
        for day in ["Monday", "tuesday", "WEDNESDAY", "Thursday", "Friday"] {
            for time in ["09:00", "10:30", "12:59", "14:00", "17:59", "2:30 PM"] {
                assert_eq!(
                    validate_appointment_time(day, time, now()),
                    Ok(()),
                    "{day} {time}"
                );
            }
        }
    }

    #[test]
    fn weekend_dates_fail_regardless_of_time() {
        // 18.10.2025 is a Saturday, 19.10.2025 a Sunday.
        assert_eq!(
            validate_appointment_time("18.10.2025", "10:00", now()),
            Err(ValidationError::Weekend("Saturday"))
        );
        assert_eq!(
            validate_appointment_time("19.10.2025", "23:00", now()),
            Err(ValidationError::Weekend("Sunday"))
        );
    }

    #[test]
    fn out_of_hours_slots_fail() {
        for time in ["08:59", "18:00", "20:00", "7:00 AM", "12:00 AM"] {
            assert_eq!(
                validate_appointment_time("Monday", time, now()),
                Err(ValidationError::OutsideWorkingHours),
                "{time}"
            );
        }
    }

    #[test]
    fn lunch_break_is_blocked_even_on_working_days() {
        for time in ["13:00", "13:30", "13:59", "1:15 PM"] {
            assert_eq!(
                validate_appointment_time("Friday", time, now()),
                Err(ValidationError::LunchBreak),
                "{time}"
            );
        }
        assert_eq!(validate_appointment_time("Friday", "14:00", now()), Ok(()));
    }

    #[test]
    fn concrete_past_datetimes_are_rejected() {
        // The day before the fixed "now" (a Monday).
        assert_eq!(
            validate_appointment_time("13.10.2025", "10:00", now()),
            Err(ValidationError::InPast)
        );
        // Same day, an hour already behind a midday "now".
        let later = at(2025, 10, 14, 12, 0);
        assert_eq!(
            validate_appointment_time("14.10.2025", "10:00", later),
            Err(ValidationError::InPast)
        );
        assert_eq!(
            validate_appointment_time("14.10.2025", "15:00", later),
            Ok(())
        );
    }

    #[test]
    fn bare_weekdays_skip_the_past_check() {
        // "Monday" the day after a Tuesday still validates: no concrete
        // date is resolved, so there is nothing to compare against.
        assert_eq!(validate_appointment_time("Monday", "10:00", now()), Ok(()));
    }

    #[test]
    fn year_is_injected_for_short_formats() {
        // 15.10 in 2025 is a Wednesday; in 2026 it is a Thursday.
        let (_, date) = parse_date("15.10", 2026).unwrap();
        assert_eq!(date, Some(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()));
    }
}
