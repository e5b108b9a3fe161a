//! Typed recurrence rules
//!
//! Rules are evaluated in local wall-clock time. Calendar rules are
//! resolved on naive date-times first, then mapped to the local zone;
//! an occurrence that falls into a DST gap is skipped.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Months searched ahead for a monthly rule before giving up
const MONTH_HORIZON: usize = 48;

/// When a recurring task comes due
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Fixed interval from the previous run
    Every { seconds: u64 },
    /// At each listed time of day
    Daily { at: Vec<NaiveTime> },
    /// On a day of the month at a time of day; months without that day are skipped
    Monthly { day: u32, at: NaiveTime },
}

impl Recurrence {
    pub fn every(seconds: u64) -> Self {
        Recurrence::Every { seconds }
    }

    pub fn daily(at: impl IntoIterator<Item = NaiveTime>) -> Self {
        let mut at: Vec<NaiveTime> = at.into_iter().collect();
        at.sort();
        at.dedup();
        Recurrence::Daily { at }
    }

    pub fn monthly(day: u32, at: NaiveTime) -> Self {
        Recurrence::Monthly { day, at }
    }

    /// Whether the rule can ever come due
    pub fn is_satisfiable(&self) -> bool {
        match self {
            Recurrence::Every { seconds } => *seconds > 0,
            Recurrence::Daily { at } => !at.is_empty(),
            Recurrence::Monthly { day, .. } => (1..=31).contains(day),
        }
    }

    /// First occurrence strictly after `now`, in naive local time
    pub fn next_after_naive(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.is_satisfiable() {
            return None;
        }

        match self {
            Recurrence::Every { seconds } => now.checked_add_signed(interval(*seconds)?),
            Recurrence::Daily { at } => {
                let today = now.date();
                let tomorrow = today.succ_opt()?;
                [today, tomorrow]
                    .into_iter()
                    .flat_map(|date| at.iter().map(move |time| date.and_time(*time)))
                    .filter(|candidate| *candidate > now)
                    .min()
            }
            Recurrence::Monthly { day, at } => {
                let (mut year, mut month) = (now.year(), now.month());
                for _ in 0..MONTH_HORIZON {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, *day) {
                        let candidate = date.and_time(*at);
                        if candidate > now {
                            return Some(candidate);
                        }
                    }
                    if month == 12 {
                        year += 1;
                        month = 1;
                    } else {
                        month += 1;
                    }
                }
                None
            }
        }
    }

    /// First occurrence strictly after `now`
    pub fn next_after(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        if let Recurrence::Every { seconds } = self {
            if *seconds == 0 {
                return None;
            }
            return now.checked_add_signed(interval(*seconds)?);
        }

        let mut cursor = now.naive_local();
        for _ in 0..MONTH_HORIZON {
            let next = self.next_after_naive(cursor)?;
            if let Some(local) = Local.from_local_datetime(&next).earliest() {
                if local > now {
                    return Some(local);
                }
            }
            cursor = next;
        }
        None
    }
}

/// `None` when the interval is beyond what chrono can represent
fn interval(seconds: u64) -> Option<chrono::Duration> {
    chrono::Duration::try_seconds(i64::try_from(seconds).ok()?)
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Every { seconds } => write!(f, "every {}s", seconds),
            Recurrence::Daily { at } => {
                let times: Vec<String> = at.iter().map(|t| t.format("%H:%M").to_string()).collect();
                write!(f, "daily at {}", times.join(", "))
            }
            Recurrence::Monthly { day, at } => {
                write!(f, "monthly on day {} at {}", day, at.format("%H:%M"))
            }
        }
    }
}
