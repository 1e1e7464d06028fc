use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::errors::{CoasterError, Result};

/// Parses the date arguments of analytics queries
pub struct TimeParser;

impl TimeParser {
    /// 解析时间字符串，支持多种格式：
    /// - RFC3339 格式：2024-10-01T12:00:00Z
    /// - 日期：2024-10-01 (UTC 零点)
    /// - 相对时间（向前）：7d, 2w, 1d12h，表示 `now` 之前
    pub fn parse_instant(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CoasterError::date_parse("Empty date"));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc());
            }
        }

        let ago = Self::parse_duration(input)?;
        now.checked_sub_signed(ago).ok_or_else(|| {
            CoasterError::date_parse(format!("'{}' reaches outside the valid time range", input))
        })
    }

    /// End-of-range form: a bare date means the last instant of that day
    pub fn parse_range_end(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let input = input.trim();
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(end) = date.and_hms_milli_opt(23, 59, 59, 999) {
                return Ok(end.and_utc());
            }
        }
        Self::parse_instant(input, now)
    }

    /// Strict range: both ends parse and start <= end
    pub fn parse_range(
        start: &str,
        end: &str,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start_dt = Self::parse_instant(start, now)?;
        let end_dt = Self::parse_range_end(end, now)?;
        if start_dt > end_dt {
            return Err(CoasterError::date_parse(format!(
                "Start '{}' is after end '{}'",
                start, end
            )));
        }
        Ok((start_dt, end_dt))
    }

    /// `1d2h30m` style durations
    pub fn parse_duration(input: &str) -> Result<Duration> {
        let mut total = Duration::zero();
        let mut remaining = input.trim();

        while !remaining.is_empty() {
            let digits = remaining
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(remaining.len());
            if digits == 0 {
                return Err(CoasterError::date_parse(format!(
                    "Invalid time format: '{}'",
                    input
                )));
            }
            let num: i64 = remaining[..digits].parse().map_err(|_| {
                CoasterError::date_parse(format!("Invalid number: '{}'", &remaining[..digits]))
            })?;
            remaining = &remaining[digits..];

            let unit_len = remaining
                .find(|c: char| !c.is_alphabetic())
                .unwrap_or(remaining.len());
            let unit = &remaining[..unit_len];
            if unit.is_empty() {
                return Err(CoasterError::date_parse(format!(
                    "Missing time unit after '{}'",
                    num
                )));
            }

            let step = match unit {
                "M" | "month" | "months" => Duration::days(num * 30),
                _ => match unit.to_lowercase().as_str() {
                    "s" | "sec" | "second" | "seconds" => Duration::seconds(num),
                    "m" | "min" | "minute" | "minutes" => Duration::minutes(num),
                    "h" | "hour" | "hours" => Duration::hours(num),
                    "d" | "day" | "days" => Duration::days(num),
                    "w" | "week" | "weeks" => Duration::weeks(num),
                    "y" | "year" | "years" => Duration::days(num * 365),
                    _ => {
                        return Err(CoasterError::date_parse(format!(
                            "Unsupported time unit: '{}'",
                            unit
                        )));
                    }
                },
            };
            total += step;
            remaining = &remaining[unit_len..];
        }

        if total == Duration::zero() {
            return Err(CoasterError::date_parse("Duration cannot be zero"));
        }
        Ok(total)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_relative_goes_back() {
        let result = TimeParser::parse_instant("7d", now()).unwrap();
        assert_eq!((now() - result).num_days(), 7);

        let result = TimeParser::parse_instant("1d2h30m", now()).unwrap();
        assert_eq!((now() - result).num_minutes(), 24 * 60 + 150);
    }

    #[test]
    fn test_parse_dates() {
        let start = TimeParser::parse_instant("2024-10-01", now()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());

        let end = TimeParser::parse_range_end("2024-10-01", now()).unwrap();
        assert!(end > start && (end - start).num_hours() == 23);

        assert!(TimeParser::parse_instant("2024-10-01T12:00:00Z", now()).is_ok());
    }

    #[test]
    fn test_strict_range() {
        assert!(TimeParser::parse_range("2024-10-01", "2024-10-01", now()).is_ok());
        let err = TimeParser::parse_range("2024-10-02", "2024-10-01", now()).unwrap_err();
        assert!(matches!(err, CoasterError::DateParse(_)));
    }

    #[test]
    fn test_invalid_format() {
        assert!(TimeParser::parse_instant("invalid", now()).is_err());
        assert!(TimeParser::parse_instant("1x", now()).is_err());
        assert!(TimeParser::parse_instant("", now()).is_err());
        assert!(TimeParser::parse_duration("0d").is_err());
    }
}
