// ABOUTME: Recurrence patterns for repeating tasks
// ABOUTME: Tagged variant stored as JSON, decoded only at the lifecycle boundary

use chrono::{DateTime, Duration, Local, LocalResult, Months, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// How a recurring task repeats. Day/week intervals are fixed-duration
/// arithmetic; month/year intervals are calendar-field arithmetic, so
/// Jan 31 + 1 month lands on the last day of February.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily {
        interval: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<NaiveTime>,
    },
    Weekly {
        interval: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<NaiveTime>,
    },
    Monthly {
        interval: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<NaiveTime>,
    },
    Yearly {
        interval: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<NaiveTime>,
    },
}

impl RecurrencePattern {
    pub fn interval(&self) -> u32 {
        match self {
            RecurrencePattern::Daily { interval, .. }
            | RecurrencePattern::Weekly { interval, .. }
            | RecurrencePattern::Monthly { interval, .. }
            | RecurrencePattern::Yearly { interval, .. } => *interval,
        }
    }

    fn time_of_day(&self) -> Option<NaiveTime> {
        match self {
            RecurrencePattern::Daily { time, .. }
            | RecurrencePattern::Weekly { time, .. }
            | RecurrencePattern::Monthly { time, .. }
            | RecurrencePattern::Yearly { time, .. } => *time,
        }
    }

    /// The next due instant, `interval` periods after `from`, optionally
    /// pinned to the pattern's local time of day.
    pub fn next_occurrence(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let local = from.with_timezone(&Local);

        let advanced = match self {
            RecurrencePattern::Daily { interval, .. } => {
                local + Duration::days(i64::from(*interval))
            }
            RecurrencePattern::Weekly { interval, .. } => {
                local + Duration::weeks(i64::from(*interval))
            }
            RecurrencePattern::Monthly { interval, .. } => local
                .checked_add_months(Months::new(*interval))
                .unwrap_or(local),
            RecurrencePattern::Yearly { interval, .. } => local
                .checked_add_months(Months::new(interval.saturating_mul(12)))
                .unwrap_or(local),
        };

        let pinned = match self.time_of_day() {
            Some(time) => {
                let naive = advanced.date_naive().and_time(time);
                match Local.from_local_datetime(&naive) {
                    LocalResult::Single(dt) => dt,
                    LocalResult::Ambiguous(dt, _) => dt,
                    LocalResult::None => advanced,
                }
            }
            None => advanced,
        };

        pinned.with_timezone(&Utc)
    }
}
