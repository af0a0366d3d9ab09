//! # Day/Time Collaborator
//!
//! The engine never does calendar math itself. It asks a [`DayClock`]
//! whether two timestamps share a calendar day and for display strings.
//! [`LocalClock`] is the default, backed by `chrono` with a fixed UTC
//! offset so results do not depend on the host timezone.

use chrono::{DateTime, Datelike, FixedOffset, Local, Offset, Utc};

pub trait DayClock {
    /// True when both epoch-second timestamps fall on the same calendar day
    /// in the viewer's time representation.
    fn same_day(&self, earlier: i64, later: i64) -> bool;

    /// Short time of day, e.g. `14:05` or `2:05 PM`.
    fn format_time(&self, timestamp: i64) -> String;

    /// Date separator text. `prev` is the timestamp of the message before
    /// the day boundary, when there is one.
    fn render_date(&self, timestamp: i64, prev: Option<i64>) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    offset: FixedOffset,
    twenty_four_hour: bool,
}

impl LocalClock {
    pub fn new(utc_offset_minutes: i32, twenty_four_hour: bool) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self {
            offset,
            twenty_four_hour,
        }
    }

    /// UTC, 24-hour. Deterministic; handy for tests and logs.
    pub fn utc() -> Self {
        Self::new(0, true)
    }

    /// The host's current UTC offset, in minutes.
    pub fn host_offset_minutes() -> i32 {
        Local::now().offset().local_minus_utc() / 60
    }

    fn to_local(&self, timestamp: i64) -> DateTime<FixedOffset> {
        // Out-of-range timestamps render as the epoch rather than failing.
        DateTime::<Utc>::from_timestamp(timestamp, 0)
            .unwrap_or_default()
            .with_timezone(&self.offset)
    }
}

impl DayClock for LocalClock {
    fn same_day(&self, earlier: i64, later: i64) -> bool {
        self.to_local(earlier).date_naive() == self.to_local(later).date_naive()
    }

    fn format_time(&self, timestamp: i64) -> String {
        let time = self.to_local(timestamp);
        if self.twenty_four_hour {
            time.format("%H:%M").to_string()
        } else {
            time.format("%-I:%M %p").to_string()
        }
    }

    fn render_date(&self, timestamp: i64, prev: Option<i64>) -> String {
        let time = self.to_local(timestamp);
        let same_year = prev.is_some_and(|p| self.to_local(p).year() == time.year());
        if same_year {
            time.format("%b %-d").to_string()
        } else {
            time.format("%b %-d, %Y").to_string()
        }
    }
}
