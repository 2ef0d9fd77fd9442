//! Time and timestamp helpers.

use chrono::{DateTime, Local};

/// Wall-clock timestamp in the receiving device's local time zone.
pub type Timestamp = DateTime<Local>;

/// Date format stamped on fall events (`2024-03-01`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 12-hour time-of-day format stamped on fall events (`07:45 PM`).
pub const TIME_FORMAT: &str = "%I:%M %p";

/// Return the current local time.
#[must_use]
pub fn now() -> Timestamp {
    Local::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_local_time() {
        let before = Local::now();
        let ts = now();
        let after = Local::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_format_afternoon_in_twelve_hour_clock() {
        let ts = Local.with_ymd_and_hms(2024, 3, 1, 19, 5, 0).unwrap();
        assert_eq!(ts.format(DATE_FORMAT).to_string(), "2024-03-01");
        assert_eq!(ts.format(TIME_FORMAT).to_string(), "07:05 PM");
    }
}
