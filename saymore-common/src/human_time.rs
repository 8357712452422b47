//! Media duration strings
//!
//! Component file metadata stores durations as text (`H:MM:SS`, optionally
//! with a day prefix `D.` and fractional seconds). These helpers convert
//! between that text and [`std::time::Duration`].

use std::time::Duration;

/// Parse a stored duration string.
///
/// Accepted forms:
/// - `H:MM` (hours and minutes)
/// - `H:MM:SS`
/// - `H:MM:SS.fff`
/// - `D.H:MM:SS[.fff]`
///
/// Returns `None` for anything else, including out-of-range minutes or seconds.
///
/// # Examples
///
/// ```
/// use saymore_common::human_time::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("0:01:30"), Some(Duration::from_secs(90)));
/// assert_eq!(parse_duration_string("1:30"), Some(Duration::from_secs(5400)));
/// assert_eq!(parse_duration_string("abc"), None);
/// ```
pub fn parse_duration_string(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    // Optional day prefix on the hours component: "D.H"
    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (d.parse::<u64>().ok()?, h.parse::<u64>().ok()?),
        None => (0, parts[0].parse::<u64>().ok()?),
    };

    let minutes = parts[1].parse::<u64>().ok()?;
    if minutes >= 60 {
        return None;
    }

    let seconds = match parts.get(2) {
        Some(s) => {
            let secs = s.parse::<f64>().ok()?;
            if !(0.0..60.0).contains(&secs) {
                return None;
            }
            secs
        }
        None => 0.0,
    };

    let whole = days * 86_400 + hours * 3_600 + minutes * 60;
    Some(Duration::from_secs(whole) + Duration::from_secs_f64(seconds))
}

/// Format a duration as `H:MM:SS`, with a `D.` prefix past 24 hours.
///
/// Fractional seconds are truncated.
///
/// # Examples
///
/// ```
/// use saymore_common::human_time::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(3661)), "1:01:01");
/// assert_eq!(format_duration(Duration::from_secs(90_000)), "1.1:00:00");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{}.{}:{:02}:{:02}", days, hours, mins, secs)
    } else {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_form() {
        assert_eq!(parse_duration_string("00:00:05"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("2:00:00"), Some(Duration::from_secs(7200)));
        assert_eq!(
            parse_duration_string("0:00:01.5"),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_parse_hours_minutes_form() {
        assert_eq!(parse_duration_string("0:05"), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_parse_day_prefix() {
        assert_eq!(
            parse_duration_string("1.02:00:00"),
            Some(Duration::from_secs(86_400 + 7_200))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_duration_string(""), None);
        assert_eq!(parse_duration_string("12"), None);
        assert_eq!(parse_duration_string("0:75:00"), None);
        assert_eq!(parse_duration_string("0:00:61"), None);
        assert_eq!(parse_duration_string("1:2:3:4"), None);
        assert_eq!(parse_duration_string("x:00:00"), None);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_duration(Duration::ZERO), "0:00:00");
        assert_eq!(format_duration(Duration::from_millis(61_900)), "0:01:01");
        assert_eq!(format_duration(Duration::from_secs(86_399)), "23:59:59");
        assert_eq!(format_duration(Duration::from_secs(2 * 86_400 + 5)), "2.0:00:05");
    }
}
