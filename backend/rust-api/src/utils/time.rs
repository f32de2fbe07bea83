use lazy_static::lazy_static;
use regex::Regex;

pub const SECONDS_PER_HOUR: u64 = 60 * 60;
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

/// Used when a time constraint cannot be understood.
pub const DEFAULT_CONSTRAINT_SECONDS: u64 = SECONDS_PER_DAY;

/// Used when a module carries no parseable estimate.
pub const DEFAULT_ESTIMATE_MINUTES: f64 = 30.0;

lazy_static! {
    static ref HOURS_RE: Regex = Regex::new(r"(\d+)\s*hours?").unwrap();
    static ref DAYS_RE: Regex = Regex::new(r"(\d+)\s*days?").unwrap();
    static ref WEEKS_RE: Regex = Regex::new(r"(\d+)\s*weeks?").unwrap();
    static ref HOUR_RANGE_RE: Regex =
        Regex::new(r"(\d+(?:\.\d+)?)(?:\s*[-–]\s*(\d+(?:\.\d+)?))?\s*(?:hours?|hrs?)").unwrap();
    static ref MINUTE_RANGE_RE: Regex =
        Regex::new(r"(\d+(?:\.\d+)?)(?:\s*[-–]\s*(\d+(?:\.\d+)?))?\s*(?:minutes?|mins?)").unwrap();
}

/// Converts a free-text time constraint ("48 hours", "3 Days", "2 weeks")
/// into seconds.
///
/// The first unit word found decides which pattern is used, checked in the
/// order hour, day, week. Anything unrecognised yields 24 hours. The function
/// is pure, so re-parsing the same string after a restart gives the same
/// value.
pub fn parse_time_constraint(constraint: &str) -> u64 {
    let text = constraint.to_lowercase();

    let (pattern, unit_seconds): (&Regex, u64) = if text.contains("hour") {
        (&HOURS_RE, SECONDS_PER_HOUR)
    } else if text.contains("day") {
        (&DAYS_RE, SECONDS_PER_DAY)
    } else if text.contains("week") {
        (&WEEKS_RE, SECONDS_PER_WEEK)
    } else {
        return DEFAULT_CONSTRAINT_SECONDS;
    };

    pattern
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(|n| n.saturating_mul(unit_seconds))
        .unwrap_or(DEFAULT_CONSTRAINT_SECONDS)
}

/// Parses a module estimate such as "30-45 minutes" or "1-2 hours" into
/// minutes. Ranges are averaged.
pub fn parse_estimated_minutes(estimate: &str) -> f64 {
    let text = estimate.to_lowercase();

    if let Some(hours) = range_average(&HOUR_RANGE_RE, &text) {
        return hours * 60.0;
    }

    range_average(&MINUTE_RANGE_RE, &text).unwrap_or(DEFAULT_ESTIMATE_MINUTES)
}

fn range_average(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    let low = caps.get(1)?.as_str().parse::<f64>().ok()?;
    match caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) {
        Some(high) => Some((low + high) / 2.0),
        None => Some(low),
    }
}

/// Rounds to one decimal place, the precision hours are reported with.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hours_days_and_weeks() {
        for n in [1u64, 2, 12, 48, 100] {
            assert_eq!(parse_time_constraint(&format!("{} hours", n)), n * 3600);
            assert_eq!(parse_time_constraint(&format!("{} days", n)), n * 86400);
            assert_eq!(parse_time_constraint(&format!("{} weeks", n)), n * 604800);
        }
    }

    #[test]
    fn singular_and_case_insensitive() {
        assert_eq!(parse_time_constraint("1 hour"), 3600);
        assert_eq!(parse_time_constraint("1 Day"), 86400);
        assert_eq!(parse_time_constraint("1 WEEK"), 604800);
        assert_eq!(parse_time_constraint("exam in 36 Hours!"), 36 * 3600);
    }

    #[test]
    fn unrecognised_defaults_to_a_day() {
        assert_eq!(parse_time_constraint(""), 86400);
        assert_eq!(parse_time_constraint("soon"), 86400);
        assert_eq!(parse_time_constraint("a few months"), 86400);
    }

    #[test]
    fn unit_word_without_number_defaults_to_a_day() {
        assert_eq!(parse_time_constraint("a couple of hours"), 86400);
    }

    #[test]
    fn hour_category_wins_over_day() {
        // "hour" is checked first, so the day count is ignored
        assert_eq!(parse_time_constraint("2 days and 5 hours"), 5 * 3600);
    }

    #[test]
    fn reparsing_is_stable() {
        let first = parse_time_constraint("3 days");
        let second = parse_time_constraint("3 days");
        assert_eq!(first, second);
    }

    #[test]
    fn estimates_average_ranges() {
        assert_eq!(parse_estimated_minutes("30-45 minutes"), 37.5);
        assert_eq!(parse_estimated_minutes("30–45 minutes"), 37.5);
        assert_eq!(parse_estimated_minutes("1-2 hours"), 90.0);
        assert_eq!(parse_estimated_minutes("45 minutes"), 45.0);
        assert_eq!(parse_estimated_minutes("2 hours"), 120.0);
        assert_eq!(parse_estimated_minutes("1.5 hours"), 90.0);
    }

    #[test]
    fn estimates_default_to_thirty_minutes() {
        assert_eq!(parse_estimated_minutes(""), 30.0);
        assert_eq!(parse_estimated_minutes("a while"), 30.0);
    }

    #[test]
    fn rounds_to_tenths() {
        assert_eq!(round_tenths(1.25), 1.3);
        assert_eq!(round_tenths(0.04), 0.0);
    }
}
