//! Daily schedule computation
//!
//! Turns a wall-clock `HH:MM` in an IANA time zone into the next UTC
//! instant the daemon should wake up for.

use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse a `HH:MM` posting time
pub fn parse_post_time(input: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|e| format!("expected HH:MM (24-hour), got '{}': {}", input, e))
}

/// Parse an IANA time zone name such as `Europe/Berlin`
pub fn parse_timezone(input: &str) -> Result<Tz, String> {
    input
        .trim()
        .parse::<Tz>()
        .map_err(|e| format!("unknown time zone '{}': {}", input, e))
}

/// A once-a-day trigger at a local wall-clock time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySchedule {
    time: NaiveTime,
    timezone: Tz,
}

impl DailySchedule {
    pub fn new(time: NaiveTime, timezone: Tz) -> Self {
        Self { time, timezone }
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Next trigger strictly after `now`
    ///
    /// A local time that falls into a DST gap moves forward by one hour; an
    /// ambiguous one resolves to the earlier instant.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.timezone).date_naive();

        (0..3)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter_map(|date| self.resolve(date))
            .find(|candidate| *candidate > now)
            .unwrap_or_else(|| now + chrono::Duration::days(1))
    }

    fn resolve(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let naive = date.and_time(self.time);
        let local = match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => self
                .timezone
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest(),
        };
        local.map(|dt| dt.with_timezone(&Utc))
    }
}
