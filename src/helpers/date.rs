//! Date helper functions

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Long Australian-English date, like "15 January 2024"
pub fn long_date(date: &DateTime<Utc>, tz: Tz) -> String {
    date.with_timezone(&tz).format("%-d %B %Y").to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<T: TimeZone>(date: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_date() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(long_date(&date, chrono_tz::Australia::Sydney), "15 January 2024");
    }

    #[test]
    fn test_long_date_crosses_midnight_in_local_zone() {
        // 14:00 UTC is already the next day in Sydney
        let date = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        assert_eq!(long_date(&date, chrono_tz::Australia::Sydney), "5 March 2024");
        assert_eq!(long_date(&date, chrono_tz::UTC), "4 March 2024");
    }
}
