use std::sync::Mutex;

use time::{
    Date, OffsetDateTime, UtcOffset,
    format_description::BorrowedFormatItem,
    macros::{format_description, offset},
};

/// Offset of the calendar used for daily counters and sign-ins.
pub const GROUP_OFFSET: UtcOffset = offset!(+8);

/// Stored form of calendar dates.
const DATE_KEY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> OffsetDateTime;

    /// Current instant expressed in [`GROUP_OFFSET`].
    fn local_now(&self) -> OffsetDateTime {
        self.now().to_offset(GROUP_OFFSET)
    }

    /// Today's calendar date in [`GROUP_OFFSET`].
    fn today(&self) -> Date {
        self.local_now().date()
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Clock frozen at `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: time::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Render a date the way it is stored (`YYYY-MM-DD`).
pub fn date_key(date: Date) -> String {
    // A date carries every component of the description.
    date.format(DATE_KEY_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// Parse a stored `YYYY-MM-DD` date.
pub fn parse_date_key(value: &str) -> Option<Date> {
    Date::parse(value, DATE_KEY_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn today_uses_the_group_calendar() {
        // 17:30 UTC is already the next day in UTC+8.
        let clock = ManualClock::new(datetime!(2026-10-17 17:30 UTC));
        assert_eq!(clock.today(), date!(2026 - 10 - 18));
        assert_eq!(clock.local_now().hour(), 1);
    }

    #[test]
    fn date_keys_round_trip() {
        let date = date!(2026 - 03 - 07);
        assert_eq!(date_key(date), "2026-03-07");
        assert_eq!(parse_date_key("2026-03-07"), Some(date));
        assert_eq!(parse_date_key("yesterday"), None);
    }

    #[test]
    fn date_keys_are_zero_padded() {
        let date = date!(0987 - 01 - 02);
        assert_eq!(date_key(date), "0987-01-02");
        assert_eq!(parse_date_key(&date_key(date)), Some(date));
    }
}
