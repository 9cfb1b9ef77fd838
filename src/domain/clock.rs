//! Business clock
//!
//! "Today" is the calendar day at the configured UTC offset. Daily
//! generation, payment recording and today's listing all read it from here.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Source of the current instant and business day
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day that keys today's billing period
    fn today(&self) -> NaiveDate;
}

/// Wall clock shifted to the market's UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Create a clock for the given offset in minutes east of UTC.
    /// Out-of-range offsets fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_offset_minutes(0)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Clock pinned to one business day, used by tooling and tests.
/// `now` still advances so audit timestamps stay ordered.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(FixedClock::new(day).today(), day);
    }

    #[test]
    fn test_extreme_offsets_are_one_or_two_days_apart() {
        let east = SystemClock::with_offset_minutes(14 * 60).today();
        let west = SystemClock::with_offset_minutes(-12 * 60).today();
        let gap = east.signed_duration_since(west);
        assert!(gap >= Duration::days(1) && gap <= Duration::days(2));
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let clock = SystemClock::with_offset_minutes(100_000);
        assert_eq!(clock.today(), SystemClock::default().today());
    }
}
